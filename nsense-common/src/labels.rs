//! Closed label spaces for instrument and note classification
//!
//! Both label spaces have a fixed declaration order. That order defines the
//! one-hot index used at training time and the probability index read back at
//! inference time, so it must never be reordered.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A closed enumeration with a stable bidirectional mapping to array index
pub trait LabelSpace: Sized + Copy + Eq + fmt::Display {
    /// Number of labels in the space
    const COUNT: usize;

    /// Position of this label in declaration order
    fn index(self) -> usize;

    /// Label at `index`, or `None` when out of range
    fn from_index(index: usize) -> Option<Self>;

    /// One-hot vector of length [`Self::COUNT`]
    fn one_hot(self) -> Vec<f32> {
        let mut encoded = vec![0.0; Self::COUNT];
        encoded[self.index()] = 1.0;
        encoded
    }

    /// Every label, in declaration order
    fn all() -> Vec<Self> {
        (0..Self::COUNT).filter_map(Self::from_index).collect()
    }
}

/// Instrument label space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Piano,
    Violin,
    ShepherdsFlute,
}

impl Instrument {
    const ALL: [Instrument; 3] = [
        Instrument::Piano,
        Instrument::Violin,
        Instrument::ShepherdsFlute,
    ];

    /// Directory name used for this instrument in a dataset root
    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Violin => "violin",
            Instrument::ShepherdsFlute => "shepherds_flute",
        }
    }
}

impl LabelSpace for Instrument {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|instrument| instrument.as_str() == s)
            .ok_or_else(|| Error::UnknownLabel(format!("instrument '{}'", s)))
    }
}

/// Chromatic note names from C3 to B5
const NOTE_NAMES: [&str; 36] = [
    "C3", "C#3", "D3", "D#3", "E3", "F3", "F#3", "G3", "G#3", "A3", "A#3", "B3",
    "C4", "C#4", "D4", "D#4", "E4", "F4", "F#4", "G4", "G#4", "A4", "A#4", "B4",
    "C5", "C#5", "D5", "D#5", "E5", "F5", "F#5", "G5", "G#5", "A5", "A#5", "B5",
];

/// MIDI number of the lowest note (C3)
const LOWEST_MIDI: u8 = 48;

/// Note label space: 36 chromatic notes spanning three octaves (C3..B5)
///
/// The inner index is private, so every `Note` in existence is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note(u8);

impl Note {
    /// Scientific pitch name, e.g. `"C#4"`
    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }

    /// MIDI note number (C3 = 48, B5 = 83)
    pub fn midi(self) -> u8 {
        LOWEST_MIDI + self.0
    }

    /// Note for a MIDI number inside the label range
    pub fn from_midi(midi: u8) -> Option<Self> {
        midi.checked_sub(LOWEST_MIDI)
            .and_then(|offset| Self::from_index(offset as usize))
    }

    /// Equal-tempered fundamental frequency in Hz (A4 = 440 Hz)
    pub fn frequency_hz(self) -> f32 {
        440.0 * 2f32.powf((self.midi() as f32 - 69.0) / 12.0)
    }
}

impl LabelSpace for Note {
    const COUNT: usize = NOTE_NAMES.len();

    fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        (index < Self::COUNT).then_some(Note(index as u8))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Note {
    type Err = Error;

    /// Exact, case-sensitive match against the 36 note names
    fn from_str(s: &str) -> Result<Self> {
        NOTE_NAMES
            .iter()
            .position(|name| *name == s)
            .map(|index| Note(index as u8))
            .ok_or_else(|| Error::UnknownLabel(format!("note '{}'", s)))
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_index_round_trip() {
        for (i, instrument) in Instrument::all().into_iter().enumerate() {
            assert_eq!(instrument.index(), i);
            assert_eq!(Instrument::from_index(i), Some(instrument));
        }
        assert_eq!(Instrument::from_index(Instrument::COUNT), None);
    }

    #[test]
    fn test_instrument_parse() {
        assert_eq!("piano".parse::<Instrument>().unwrap(), Instrument::Piano);
        assert_eq!(
            "shepherds_flute".parse::<Instrument>().unwrap(),
            Instrument::ShepherdsFlute
        );
        assert!("Piano".parse::<Instrument>().is_err());
        assert!("cello".parse::<Instrument>().is_err());
    }

    #[test]
    fn test_note_space_has_36_notes() {
        assert_eq!(Note::COUNT, 36);
        let all = Note::all();
        assert_eq!(all.len(), 36);
        assert_eq!(all[0].name(), "C3");
        assert_eq!(all[35].name(), "B5");
    }

    #[test]
    fn test_note_parse() {
        let c4: Note = "C4".parse().unwrap();
        assert_eq!(c4.index(), 12);
        assert_eq!(c4.midi(), 60);

        let a_sharp_5: Note = "A#5".parse().unwrap();
        assert_eq!(a_sharp_5.name(), "A#5");

        assert!("H9".parse::<Note>().is_err());
        assert!("c4".parse::<Note>().is_err());
        assert!("Db4".parse::<Note>().is_err());
        assert!("C6".parse::<Note>().is_err());
    }

    #[test]
    fn test_note_midi_mapping() {
        assert_eq!(Note::from_midi(48).unwrap().name(), "C3");
        assert_eq!(Note::from_midi(83).unwrap().name(), "B5");
        assert!(Note::from_midi(47).is_none());
        assert!(Note::from_midi(84).is_none());
    }

    #[test]
    fn test_note_frequency() {
        let a4: Note = "A4".parse().unwrap();
        assert!((a4.frequency_hz() - 440.0).abs() < 1e-3);

        let a3: Note = "A3".parse().unwrap();
        assert!((a3.frequency_hz() - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_one_hot() {
        let encoded = Instrument::Violin.one_hot();
        assert_eq!(encoded, vec![0.0, 1.0, 0.0]);

        let note: Note = "B5".parse().unwrap();
        let encoded = note.one_hot();
        assert_eq!(encoded.len(), 36);
        assert_eq!(encoded[35], 1.0);
        assert_eq!(encoded.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Instrument::ShepherdsFlute).unwrap();
        assert_eq!(json, "\"shepherds_flute\"");

        let note: Note = serde_json::from_str("\"G#3\"").unwrap();
        assert_eq!(note.name(), "G#3");
        assert!(serde_json::from_str::<Note>("\"H9\"").is_err());
    }
}
