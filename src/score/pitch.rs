//! Pitch names, frequencies, and the supported chord table.

/// Reference pitch for equal temperament (A4).
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI note number of A4.
const A4_MIDI: i32 = 69;

/// Sharp-based note names used for display.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Chord symbols the editor offers (triads of the natural major scale).
pub const CHORD_OPTIONS: [&str; 7] = ["C", "Dm", "Em", "F", "G", "Am", "Bdim"];

/// Pitches offered by the melody grid, lowest first.
pub const MELODY_NOTE_OPTIONS: [&str; 14] = [
    "C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5", "D5", "E5", "F5", "G5", "A5", "B5",
];

/// Returns the three pitch names of a supported chord symbol.
///
/// Unknown symbols return `None`; the scheduler skips them.
pub fn chord_tones(symbol: &str) -> Option<[&'static str; 3]> {
    let tones = match symbol {
        "C" => ["C4", "E4", "G4"],
        "Dm" => ["D4", "F4", "A4"],
        "Em" => ["E4", "G4", "B4"],
        "F" => ["F4", "A4", "C5"],
        "G" => ["G4", "B4", "D5"],
        "Am" => ["A4", "C5", "E5"],
        "Bdim" => ["B4", "D5", "F5"],
        _ => return None,
    };
    Some(tones)
}

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// ```
/// use scoreplay::score::note_to_name;
///
/// assert_eq!(note_to_name(60), "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Converts a note name like "C4", "F#5" or "Bb3" to a MIDI note number.
///
/// The letter is case-insensitive. Returns `None` for malformed names and
/// for pitches outside 0-127.
pub fn name_to_note(name: &str) -> Option<u8> {
    let name = name.trim();
    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = &name[letter.len_utf8()..];
    let (accidental, octave_part) = match rest.as_bytes().first() {
        Some(b'#') => (1, &rest[1..]),
        Some(b'b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    // Octave must be a plain (optionally negative) integer
    let digits = octave_part.strip_prefix('-').unwrap_or(octave_part);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave_part.parse().ok()?;

    let midi = octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(base + accidental)?;
    u8::try_from(midi).ok().filter(|n| *n <= 127)
}

/// Equal-tempered frequency of a MIDI note number.
pub fn note_frequency(note: u8) -> f64 {
    A4_FREQUENCY * 2f64.powf((note as i32 - A4_MIDI) as f64 / 12.0)
}

/// Frequency in Hz of a pitch name, or `None` if the name is not a pitch.
pub fn name_to_frequency(name: &str) -> Option<f64> {
    name_to_note(name).map(note_frequency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_to_name() {
        assert_eq!(note_to_name(60), "C4");
        assert_eq!(note_to_name(69), "A4");
        assert_eq!(note_to_name(0), "C-1");
        assert_eq!(note_to_name(127), "G9");
    }

    #[test]
    fn test_name_to_note() {
        assert_eq!(name_to_note("C4"), Some(60));
        assert_eq!(name_to_note("a4"), Some(69));
        assert_eq!(name_to_note("C#4"), Some(61));
        assert_eq!(name_to_note("Db4"), Some(61));
        assert_eq!(name_to_note("Bb3"), Some(58));
        assert_eq!(name_to_note("C-1"), Some(0));
        assert_eq!(name_to_note("H4"), None);
        assert_eq!(name_to_note("C"), None);
        assert_eq!(name_to_note("C4x"), None);
        assert_eq!(name_to_note("G10"), None);
    }

    #[test]
    fn test_huge_octave_is_not_a_pitch() {
        assert_eq!(name_to_note("C200000000"), None);
        assert_eq!(name_to_note("B-200000000"), None);
        assert_eq!(name_to_note("C99999999999"), None);
        assert_eq!(name_to_frequency("C200000000"), None);
    }

    #[test]
    fn test_frequencies() {
        assert!((name_to_frequency("A4").unwrap() - 440.0).abs() < 1e-9);
        assert!((name_to_frequency("A5").unwrap() - 880.0).abs() < 1e-9);
        assert!((name_to_frequency("C4").unwrap() - 261.6256).abs() < 1e-3);
        assert_eq!(name_to_frequency("nope"), None);
    }

    #[test]
    fn test_chord_table() {
        assert_eq!(chord_tones("C"), Some(["C4", "E4", "G4"]));
        assert_eq!(chord_tones("Bdim"), Some(["B4", "D5", "F5"]));
        assert_eq!(chord_tones("C7"), None);
        for symbol in CHORD_OPTIONS {
            let tones = chord_tones(symbol).unwrap();
            assert!(tones.iter().all(|t| name_to_note(t).is_some()));
        }
    }
}
