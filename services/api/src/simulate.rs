use crate::infra::{InMemoryEventSink, InMemorySessionGateway, QuizCatalogs};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use style_quiz::discovery::{
    Direction, EngineSettings, EscalationSignal, QuizId, RandomChooser, RoomFilter,
    SessionGateway, SessionSummary, SwipeEngine,
};
use style_quiz::error::AppError;

#[derive(Args, Debug, Default)]
pub(crate) struct SimulateArgs {
    /// Catalog file (.json or .csv). Defaults to the bundled showroom.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Quiz identifier sent with the session request.
    #[arg(long, default_value = "simulation")]
    pub(crate) quiz: String,
    /// Swipe right on styles whose id or name contains this text (repeatable).
    #[arg(long)]
    pub(crate) like: Vec<String>,
    /// Restrict cards to these rooms (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub(crate) rooms: Vec<String>,
    /// Seed deck composition for a reproducible run.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Free text supplied whenever the round asks for more input.
    #[arg(long)]
    pub(crate) preferences: Option<String>,
    /// How many styles and details to list in the summary.
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimulatedSwipe {
    pub(crate) number: u32,
    pub(crate) style: String,
    pub(crate) image_id: String,
    pub(crate) liked: bool,
    pub(crate) prompts: Vec<&'static str>,
}

pub(crate) fn run_simulation(args: SimulateArgs) -> Result<(), AppError> {
    let SimulateArgs {
        catalog,
        quiz,
        like,
        rooms,
        seed,
        preferences,
        top,
    } = args;

    let catalogs = QuizCatalogs::from_config(catalog)?;
    let events = Arc::new(InMemoryEventSink::default());
    let gateway = InMemorySessionGateway::default();
    let mut engine = SwipeEngine::new(EngineSettings::default(), events.clone())
        .with_chooser(Box::new(RandomChooser::from_seed(seed)));

    let request = engine.start(QuizId(quiz), RoomFilter::new(rooms), &catalogs)?;
    println!("Style quiz simulation");
    println!("  Quiz: {}", request.quiz_id.0);
    if request.selected_rooms.is_empty() {
        println!("  Rooms: all");
    } else {
        println!("  Rooms: {}", request.selected_rooms.join(", "));
    }
    match gateway.create_session(&request) {
        Ok(session_id) => {
            println!("  Session: {}", session_id.0);
            engine.attach_session(session_id);
        }
        Err(err) => println!("  Session: unavailable ({err})"),
    }

    let patterns = normalize_patterns(&like);
    let swipes = play(&mut engine, &patterns, preferences.as_deref());

    println!("\nSwipes");
    for swipe in &swipes {
        println!(
            "  {:>2}. {:<5} {:<24} {}",
            swipe.number,
            if swipe.liked { "like" } else { "pass" },
            swipe.style,
            swipe.image_id
        );
        for prompt in &swipe.prompts {
            println!("      ! {prompt}");
        }
    }

    match engine.summary(top) {
        Some(summary) => render_summary(&summary),
        None => println!("\nNo round was played."),
    }
    println!("\nAnalytics events delivered: {}", events.swipes().len());

    Ok(())
}

/// Swipes until the round finishes, liking every style that matches a pattern.
pub(crate) fn play(
    engine: &mut SwipeEngine,
    patterns: &[String],
    preferences: Option<&str>,
) -> Vec<SimulatedSwipe> {
    let mut swipes = Vec::new();

    while let Some(card) = engine.current_card().cloned() {
        let style = engine
            .catalog()
            .and_then(|catalog| catalog.style(&card.style_id))
            .map(|style| style.name.clone())
            .unwrap_or_else(|| card.style_id.0.clone());
        let liked = matches_any(patterns, &card.style_id.0, &style);
        let direction = if liked {
            Direction::Right
        } else {
            Direction::Left
        };

        let outcome = engine.swipe(direction);
        let Some(report) = outcome.report() else {
            break;
        };

        let prompts: Vec<&'static str> = report.signals.iter().map(signal_prompt).collect();
        if !prompts.is_empty() {
            if let Some(text) = preferences {
                engine.provide_preferences(text);
            }
        }

        swipes.push(SimulatedSwipe {
            number: report.total_swipes,
            style,
            image_id: card.image.id.0,
            liked,
            prompts,
        });
    }

    swipes
}

fn normalize_patterns(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|pattern| pattern.trim().to_ascii_lowercase())
        .filter(|pattern| !pattern.is_empty())
        .collect()
}

fn matches_any(patterns: &[String], style_id: &str, style_name: &str) -> bool {
    let id = style_id.to_ascii_lowercase();
    let name = style_name.to_ascii_lowercase();
    patterns
        .iter()
        .any(|pattern| id.contains(pattern.as_str()) || name.contains(pattern.as_str()))
}

fn signal_prompt(signal: &EscalationSignal) -> &'static str {
    match signal {
        EscalationSignal::DislikeStreak { prompt, .. }
        | EscalationSignal::PoolTooSmall { prompt, .. } => *prompt,
    }
}

fn render_summary(summary: &SessionSummary) {
    println!("\nResult: {}", summary.finish_label());
    println!(
        "  Swipes: {} | Rejected styles: {} | Decision changes: {}",
        summary.total_swipes, summary.rejected_styles, summary.decision_changes
    );
    if let Some(mean) = summary.mean_reaction_ms {
        println!("  Mean reaction: {mean} ms");
    }

    println!("\nTop styles");
    for standing in &summary.top_styles {
        println!(
            "  - {:<24} score {:>3} | liked {}/{}",
            standing.name, standing.score, standing.liked, standing.shown
        );
    }

    if !summary.favored_details.is_empty() {
        println!("\nFavored details");
        for detail in &summary.favored_details {
            println!(
                "  - {} ({}) score {}",
                detail.name, detail.category, detail.score
            );
        }
    }
    if !summary.avoided_details.is_empty() {
        println!("\nAvoided details");
        for detail in &summary.avoided_details {
            println!(
                "  - {} ({}) score {}",
                detail.name, detail.category, detail.score
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::bundled_catalog;
    use style_quiz::discovery::{FinishReason, NullRecorder};

    fn engine(seed: u64) -> SwipeEngine {
        let mut engine = SwipeEngine::new(EngineSettings::default(), Arc::new(NullRecorder))
            .with_chooser(Box::new(RandomChooser::seeded(seed)));
        engine
            .load(
                QuizId("simulation".to_string()),
                RoomFilter::default(),
                bundled_catalog().expect("bundled catalog"),
            )
            .expect("round starts");
        engine
    }

    #[test]
    fn patterns_match_ids_and_names_case_insensitively() {
        let patterns = normalize_patterns(&["  LOFT ".to_string(), String::new()]);
        assert_eq!(patterns, vec!["loft"]);

        assert!(matches_any(&patterns, "industrial-loft", "Industrial Loft"));
        assert!(matches_any(&["deco".to_string()], "art-deco", "Art Deco"));
        assert!(!matches_any(&patterns, "coastal", "Coastal"));
        assert!(!matches_any(&[], "coastal", "Coastal"));
    }

    #[test]
    fn liking_nothing_plays_to_the_swipe_limit() {
        let mut engine = engine(5);

        let swipes = play(&mut engine, &[], None);

        assert_eq!(swipes.len(), 40);
        assert!(swipes.iter().all(|swipe| !swipe.liked));
        assert_eq!(
            engine.finish().map(|finish| finish.reason),
            Some(FinishReason::LimitReached)
        );
        let prompts: usize = swipes.iter().map(|swipe| swipe.prompts.len()).sum();
        assert_eq!(prompts, 4);
    }

    #[test]
    fn streak_prompts_collect_preference_text() {
        let mut engine = engine(8);

        play(&mut engine, &[], Some("warm timber"));

        let text = engine
            .session()
            .map(|session| session.user_preference_text)
            .unwrap_or_default();
        assert!(text.starts_with("warm timber"));
    }

    #[test]
    fn liked_patterns_drive_every_right_swipe() {
        let mut engine = engine(13);
        let patterns = normalize_patterns(&["loft".to_string(), "japandi".to_string()]);

        let swipes = play(&mut engine, &patterns, None);

        assert!(!swipes.is_empty());
        for swipe in &swipes {
            let expected = swipe.style == "Industrial Loft" || swipe.style == "Japandi";
            assert_eq!(swipe.liked, expected, "unexpected swipe {swipe:?}");
        }
        assert!(engine.finish().is_some());
    }
}
