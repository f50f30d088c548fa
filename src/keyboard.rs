use std::collections::HashMap;
use std::sync::OnceLock;

pub const BACKSPACE_LABEL: &str = "Backspace";

pub const TYPO_ALPHABET: [char; 26] = [
    'q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p', 'a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l',
    'z', 'x', 'c', 'v', 'b', 'n', 'm',
];

pub const KEYBOARD_ROWS: [&[&str]; 3] = [
    &["q", "w", "e", "r", "t", "y", "u", "i", "o", "p", BACKSPACE_LABEL],
    &["a", "s", "d", "f", "g", "h", "j", "k", "l"],
    &["z", "x", "c", "v", "b", "n", "m"],
];

#[derive(Debug, Clone)]
pub struct KeyAdjacency {
    neighbors: HashMap<char, &'static [char]>,
}

impl KeyAdjacency {
    fn us_qwerty() -> Self {
        let table: [(char, &'static [char]); 26] = [
            ('q', &['w', 'a', 's']),
            ('w', &['q', 'e', 'a', 's', 'd']),
            ('e', &['w', 'r', 's', 'd', 'f']),
            ('r', &['e', 't', 'd', 'f', 'g']),
            ('t', &['r', 'y', 'f', 'g', 'h']),
            ('y', &['t', 'u', 'g', 'h', 'j']),
            ('u', &['y', 'i', 'h', 'j', 'k']),
            ('i', &['u', 'o', 'j', 'k', 'l']),
            ('o', &['i', 'p', 'k', 'l']),
            ('p', &['o', 'l']),
            ('a', &['q', 'w', 's', 'z', 'x']),
            ('s', &['q', 'w', 'e', 'a', 'd', 'z', 'x', 'c']),
            ('d', &['w', 'e', 'r', 's', 'f', 'x', 'c', 'v']),
            ('f', &['e', 'r', 't', 'd', 'g', 'c', 'v', 'b']),
            ('g', &['r', 't', 'y', 'f', 'h', 'v', 'b', 'n']),
            ('h', &['t', 'y', 'u', 'g', 'j', 'b', 'n', 'm']),
            ('j', &['y', 'u', 'i', 'h', 'k', 'n', 'm']),
            ('k', &['u', 'i', 'o', 'j', 'l', 'm']),
            ('l', &['i', 'o', 'p', 'k']),
            ('z', &['a', 's', 'x']),
            ('x', &['a', 's', 'd', 'z', 'c']),
            ('c', &['s', 'd', 'f', 'x', 'v']),
            ('v', &['d', 'f', 'g', 'c', 'b']),
            ('b', &['f', 'g', 'h', 'v', 'n']),
            ('n', &['g', 'h', 'j', 'b', 'm']),
            ('m', &['h', 'j', 'k', 'n']),
        ];

        Self {
            neighbors: table.into_iter().collect(),
        }
    }

    pub fn qwerty() -> &'static KeyAdjacency {
        static TABLE: OnceLock<KeyAdjacency> = OnceLock::new();
        TABLE.get_or_init(KeyAdjacency::us_qwerty)
    }

    pub fn neighbors(&self, c: char) -> &[char] {
        let lower = c.to_ascii_lowercase();
        self.neighbors.get(&lower).copied().unwrap_or(&[])
    }
}

pub fn key_label_for_char(c: char) -> String {
    c.to_lowercase().collect()
}

pub fn key_position(label: &str) -> Option<(usize, usize)> {
    KEYBOARD_ROWS.iter().enumerate().find_map(|(row, keys)| {
        keys.iter()
            .position(|k| *k == label)
            .map(|col| (row, col))
    })
}
