use crate::models::{NoteStyle, WeatherContext};

/// Words that must never appear in a note shown to the user. Covers
/// negative sentiment and body-shape descriptors.
const BANNED_WORDS: &[&str] = &[
    "bad", "ugly", "fat", "skinny", "thin", "chubby", "frumpy", "boring", "wrong", "worse",
    "unflattering", "flabby", "plump",
];

pub struct NoteContext<'a> {
    pub style: NoteStyle,
    pub weather: &'a WeatherContext,
    pub occasion: &'a str,
    /// Lead item color, used to anchor the note to the outfit.
    pub anchor_color: Option<&'a str>,
    /// The user previously rated an item in this outfit highly.
    pub has_positive_history: bool,
    /// Any source fell back to cached or default data.
    pub approximate: bool,
}

/// Builds the short reassurance line attached to each recommendation.
/// Always second person, always references the day's weather, never uses
/// the banned vocabulary.
pub fn compose_note(ctx: &NoteContext) -> String {
    let weather_phrase = weather_phrase(ctx.weather);
    let anchor = ctx.anchor_color.unwrap_or("favorite");

    let mut note = match ctx.style {
        NoteStyle::Encouraging => format!(
            "You are set for {} {}: this {} look carries you through your {} plans with ease.",
            weather_phrase.article, weather_phrase.text, anchor, ctx.occasion
        ),
        NoteStyle::Witty => format!(
            "{} called, and your {} look already answered. Consider your {} plans handled.",
            capitalize(&weather_phrase.text),
            anchor,
            ctx.occasion
        ),
        NoteStyle::Poetic => format!(
            "Under {} {}, you step out in {} tones, and the {} day opens to meet you.",
            weather_phrase.article, weather_phrase.text, anchor, ctx.occasion
        ),
    };

    if ctx.has_positive_history {
        note.push_str(" You loved a piece of this look before, and it shows.");
    }
    if ctx.approximate {
        note.push_str(" Styled from your latest saved details while we refresh the data.");
    }

    debug_assert!(!contains_banned_language(&note));
    note
}

struct WeatherPhrase {
    article: &'static str,
    text: String,
}

fn weather_phrase(weather: &WeatherContext) -> WeatherPhrase {
    let text = format!(
        "{} {:.0}\u{00b0}C day",
        weather.condition.label(),
        weather.temperature_c
    );
    WeatherPhrase { article: "a", text }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn contains_banned_language(note: &str) -> bool {
    let lower = note.to_lowercase();
    BANNED_WORDS.iter().any(|w| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == *w)
    })
}

pub fn is_second_person(note: &str) -> bool {
    let lower = note.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == "you" || token == "your")
}
