//! Stable, human-readable device names.
//!
//! A robot advertises itself as `Hexapod <name>`, where the name is picked
//! from a fixed table by the byte sum of its hardware address. The same board
//! always gets the same name.

extern crate alloc;

use alloc::format;
use alloc::string::String;

pub const NAME_PREFIX: &str = "Hexapod";

pub const NAMES: [&str; 110] = [
    "Jole",
    "Fule",
    "Vlax",
    "Tuna",
    "Maricello",
    "Mia",
    "Jan",
    "Peewee",
    "Bobby",
    "Beatrix",
    "Blaire",
    "Callie",
    "Cecily",
    "Cleo",
    "Coco",
    "Cosette",
    "Cybil",
    "Daisy",
    "Delaney",
    "Delilah",
    "Eden",
    "Edie",
    "Etta",
    "Everly",
    "Finley",
    "Georgia",
    "Gwendolyn",
    "Hadley",
    "Harper",
    "Holliday",
    "Isla",
    "January",
    "Juniper",
    "Kenzie",
    "Lola",
    "Lulu",
    "Mabel",
    "Mae",
    "Minnie",
    "Nala",
    "Nova",
    "Penelope",
    "Perla",
    "Piper",
    "Poppy",
    "Rebel",
    "Rowan",
    "Sage",
    "Simone",
    "Siobhan",
    "Sloane",
    "Sparrow",
    "Stella",
    "Stevie",
    "Tallulah",
    "Tatum",
    "Quinlynn",
    "Wren",
    "Zelda",
    "Ace",
    "Ajax",
    "Arrow",
    "Ash",
    "August",
    "Axel",
    "Beckett",
    "Booker",
    "Brees",
    "Bruno",
    "Buster",
    "Calloway",
    "Colton",
    "Cormac",
    "Cruz",
    "Dash",
    "Dean",
    "Dexter",
    "Donovan",
    "Elvis",
    "Finn",
    "Echo",
    "Enzo",
    "Felix",
    "Fritz",
    "Griffith",
    "Gunner",
    "Gus",
    "Grayson",
    "Hunter",
    "Jamison",
    "Jax",
    "Lincoln",
    "Maddox",
    "Magnus",
    "Max",
    "Orion",
    "Phoenix",
    "Pierce",
    "Porter",
    "Reid",
    "Rhett",
    "Rhys",
    "Rocco",
    "Ryland",
    "Thorn",
    "Titus",
    "Quinton",
    "Wilder",
    "Zander",
    "Zeke",
];

pub fn sum_bytes(addr: &[u8]) -> u32 {
    addr.iter().map(|&b| b as u32).sum()
}

pub fn generate_name(number: u32) -> &'static str {
    NAMES[number as usize % NAMES.len()]
}

/// Name advertised over the link for the board with hardware address `mac`.
pub fn advertised_name(mac: &[u8; 6]) -> String {
    format!("{} {}", NAME_PREFIX, generate_name(sum_bytes(mac)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_picked_by_address_sum() {
        assert_eq!(generate_name(0), "Jole");
        assert_eq!(generate_name(109), "Zeke");
        assert_eq!(generate_name(110), "Jole");
        assert_eq!(sum_bytes(&[0xFF; 6]), 1530);
        // 1530 % 110 = 100
        assert_eq!(advertised_name(&[0xFF; 6]), "Hexapod Rhys");
    }

    #[test]
    fn same_address_same_name() {
        let mac = [0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56];
        assert_eq!(advertised_name(&mac), advertised_name(&mac));
        assert!(advertised_name(&mac).starts_with("Hexapod "));
    }
}
