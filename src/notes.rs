// ABOUTME: Speaker notes exporter for the slides-creator application
// ABOUTME: Flattens a deck's headings and notes into a plain-text document

use crate::deck::SlideDeck;

pub struct SpeakerNotesExporter;

impl SpeakerNotesExporter {
    pub fn export(deck: &SlideDeck) -> String {
        let mut out = String::new();
        out.push_str(deck.title());
        out.push_str("\nSpeaker Notes\n");

        for (i, slide) in deck.slides().iter().enumerate() {
            out.push_str(&format!("\nSlide {}: {}\n", i + 1, slide.heading()));
            let notes = slide.speaker_notes.trim();
            if notes.is_empty() {
                out.push_str("(no notes)\n");
            } else {
                out.push_str(notes);
                out.push('\n');
            }
        }
        out
    }
}

/// Export the notes of a deck as text
pub fn export(deck: &SlideDeck) -> String {
    SpeakerNotesExporter::export(deck)
}
