//! Nearest-template chord classification.
//!
//! Each chroma frame is scored against 24 binary triad templates (12 major,
//! then 12 minor) and labelled with the best match. Frames are classified
//! independently; there is no smoothing between neighbours, so a sustained
//! chord can flicker when two templates score closely.

use std::fmt;

use super::features::{Chroma, N_CHROMA};

pub const NUM_TEMPLATES: usize = 2 * N_CHROMA;

const MAJOR_INTERVALS: [usize; 3] = [0, 4, 7];
const MINOR_INTERVALS: [usize; 3] = [0, 3, 7];

const CHORD_NAMES: [&str; NUM_TEMPLATES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    "Cm", "C#m", "Dm", "D#m", "Em", "Fm", "F#m", "Gm", "G#m", "Am", "A#m", "Bm",
];

/// The template bank in enumeration order. Ties between templates are
/// broken by this order.
pub const TEMPLATE_BANK: [[f32; N_CHROMA]; NUM_TEMPLATES] = build_bank();

const fn build_bank() -> [[f32; N_CHROMA]; NUM_TEMPLATES] {
    let mut bank = [[0.0; N_CHROMA]; NUM_TEMPLATES];
    let mut root = 0;
    while root < N_CHROMA {
        let mut i = 0;
        while i < 3 {
            bank[root][(root + MAJOR_INTERVALS[i]) % N_CHROMA] = 1.0;
            bank[N_CHROMA + root][(root + MINOR_INTERVALS[i]) % N_CHROMA] = 1.0;
            i += 1;
        }
        root += 1;
    }
    bank
}

/// A chord from the template bank, identified by its bank index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chord(u8);

impl Chord {
    pub fn from_index(index: usize) -> Option<Self> {
        (index < NUM_TEMPLATES).then_some(Chord(index as u8))
    }

    /// Every chord in bank order.
    pub fn all() -> impl Iterator<Item = Chord> {
        (0..NUM_TEMPLATES).filter_map(Chord::from_index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        CHORD_NAMES[self.index()]
    }

    pub fn template(self) -> &'static [f32; N_CHROMA] {
        &TEMPLATE_BANK[self.index()]
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Label one frame with the best-scoring template. Total: a silent frame
/// scores zero everywhere and resolves to the first template.
pub fn classify(chroma: &Chroma) -> Chord {
    let mut best = Chord(0);
    let mut best_score = f32::NEG_INFINITY;
    for chord in Chord::all() {
        let score: f32 = chord.template().iter().zip(chroma.iter()).map(|(t, c)| t * c).sum();
        if score > best_score {
            best = chord;
            best_score = score;
        }
    }
    best
}

pub fn recognize(chroma: &[Chroma]) -> Vec<Chord> {
    chroma.iter().map(classify).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_of(chroma: Chroma) -> &'static str {
        classify(&chroma).name()
    }

    #[test]
    fn bank_marks_root_third_fifth() {
        assert_eq!(
            TEMPLATE_BANK[0],
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]
        );
        // A minor: A, C, E
        let am = Chord::from_index(21).unwrap();
        assert_eq!(am.name(), "Am");
        let marked: Vec<usize> = (0..N_CHROMA).filter(|&i| am.template()[i] == 1.0).collect();
        assert_eq!(marked, vec![0, 4, 9]);
        // A# major wraps around: A#, D, F
        let a_sharp = Chord::from_index(10).unwrap();
        let marked: Vec<usize> = (0..N_CHROMA).filter(|&i| a_sharp.template()[i] == 1.0).collect();
        assert_eq!(marked, vec![2, 5, 10]);

        for template in TEMPLATE_BANK.iter() {
            assert_eq!(template.iter().sum::<f32>(), 3.0);
        }
    }

    #[test]
    fn c_major_template_is_labelled_c() {
        assert_eq!(
            name_of([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
            "C"
        );
    }

    #[test]
    fn every_template_classifies_as_itself() {
        for (i, template) in TEMPLATE_BANK.iter().enumerate() {
            assert_eq!(classify(template).index(), i, "template {}", CHORD_NAMES[i]);
        }
    }

    #[test]
    fn silent_frame_resolves_to_first_template() {
        for _ in 0..3 {
            assert_eq!(name_of([0.0; N_CHROMA]), "C");
        }
    }

    #[test]
    fn ties_prefer_major_then_lower_root() {
        // E and G lit: C major and E minor both score 2; C comes first.
        let mut chroma = [0.0; N_CHROMA];
        chroma[4] = 1.0;
        chroma[7] = 1.0;
        assert_eq!(name_of(chroma), "C");

        // A and E: A major (A C# E) ties with A minor (A C E); major wins.
        let mut chroma = [0.0; N_CHROMA];
        chroma[9] = 1.0;
        chroma[4] = 1.0;
        assert_eq!(name_of(chroma), "A");
    }

    #[test]
    fn minor_wins_when_minor_third_is_present() {
        let mut chroma = [0.1; N_CHROMA];
        chroma[9] = 1.0; // A
        chroma[0] = 0.9; // C
        chroma[4] = 0.8; // E
        assert_eq!(name_of(chroma), "Am");
    }

    #[test]
    fn recognize_preserves_frame_order_without_smoothing() {
        let c = TEMPLATE_BANK[0];
        let g = *Chord::from_index(7).unwrap().template();
        let labels: Vec<&str> = recognize(&[c, g, c]).iter().map(|c| c.name()).collect();
        assert_eq!(labels, vec!["C", "G", "C"]);
    }

    #[test]
    fn all_walks_the_bank_in_order() {
        let names: Vec<&str> = Chord::all().map(Chord::name).collect();
        assert_eq!(names.len(), NUM_TEMPLATES);
        assert_eq!(names[..3], ["C", "C#", "D"]);
        assert_eq!(names[12], "Cm");
        assert_eq!(names[23], "Bm");
    }

    #[test]
    fn chord_accessors() {
        let fsm = Chord::from_index(18).unwrap();
        assert_eq!(fsm.to_string(), "F#m");
        assert_eq!(fsm.index(), 18);
        assert!(Chord::from_index(NUM_TEMPLATES).is_none());
    }
}
