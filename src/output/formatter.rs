use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::profiles::ScoringProfile;
use crate::scoring::{
    CategoryId, CategoryScore, ConfigSource, ParameterResult, Recommendation, RecommendationBands,
    ScoreReport, Status, Weights,
};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a 0-100 score, or "n/a" when it is undefined
pub fn format_score(score: Option<u8>) -> String {
    match score {
        Some(value) => value.to_string(),
        None => "n/a".to_string(),
    }
}

/// Format a weight without a trailing ".0"
pub fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0}", weight)
    } else {
        format!("{:.1}", weight)
    }
}

pub fn format_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Preset { loan_type } => format!("{} preset", loan_type),
        ConfigSource::Profile { id, name } => format!("profile '{}' ({})", name, id),
    }
}

fn paint_status(status: Status, text: &str, use_colors: bool) -> String {
    if !use_colors {
        return text.to_string();
    }
    match status {
        Status::Good => text.green().to_string(),
        Status::Average => text.yellow().to_string(),
        Status::Negative => text.red().to_string(),
    }
}

fn paint_recommendation(recommendation: Recommendation, use_colors: bool) -> String {
    let text = recommendation.summary();
    if !use_colors {
        return text.to_string();
    }
    match recommendation {
        Recommendation::Approve => text.green().bold().to_string(),
        Recommendation::Review => text.yellow().bold().to_string(),
        Recommendation::Decline => text.red().bold().to_string(),
        Recommendation::InsufficientData => text.dimmed().to_string(),
    }
}

fn format_parameter(parameter: &ParameterResult, use_colors: bool) -> String {
    let raw = parameter
        .raw_value
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = paint_status(
        parameter.status,
        &format!("{:<8}", parameter.status.as_str()),
        use_colors,
    );
    let mut line = format!(
        "    {:<28} {:>12}  {} +{}",
        parameter.name, raw, status, parameter.points
    );

    if let Some(reason) = parameter.defaulted {
        let note = format!("  (defaulted: {})", reason.describe());
        if use_colors {
            line.push_str(&note.dimmed().to_string());
        } else {
            line.push_str(&note);
        }
    }
    line
}

fn format_category(category: &CategoryScore, use_colors: bool) -> String {
    let heading = format!("{} ({})", category.name, category.traditional_mapping);
    let heading = if use_colors {
        heading.bold().to_string()
    } else {
        heading
    };

    let mut lines = vec![format!(
        "  {}  score {}  weight {}  [{}/{}]",
        heading,
        format_score(category.score),
        format_weight(category.weight),
        category.raw_score,
        category.max_score
    )];
    lines.extend(
        category
            .parameters
            .iter()
            .map(|p| format_parameter(p, use_colors)),
    );
    lines.join("\n")
}

/// Format a full score report with per-parameter detail
pub fn format_report(report: &ScoreReport, bands: &RecommendationBands, use_colors: bool) -> String {
    let mut sections = vec![format!(
        "{} [{}] - {} loan, scored with {}",
        report.borrower_name,
        report.borrower_id,
        report.loan_type,
        format_source(&report.source)
    )];

    if report.categories.is_empty() {
        sections.push("  No enabled categories.".to_string());
    } else {
        sections.extend(
            report
                .categories
                .iter()
                .map(|c| format_category(c, use_colors)),
        );
    }

    let overall = format!("Overall: {}", format_score(report.overall));
    let overall = if use_colors {
        overall.bold().to_string()
    } else {
        overall
    };
    sections.push(format!(
        "{}  ({}/{} points)  Recommendation: {}",
        overall,
        report.total_score,
        report.max_possible_score,
        paint_recommendation(report.recommendation(bands), use_colors)
    ));

    sections.join("\n\n")
}

/// Format category scores as tab-separated values for scripting
/// Columns: category, score (no headers, no colors); last row is overall
pub fn format_tsv(report: &ScoreReport) -> String {
    report
        .categories
        .iter()
        .map(|c| format!("{}\t{}", c.id, format_score(c.score)))
        .chain(std::iter::once(format!(
            "overall\t{}",
            format_score(report.overall)
        )))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a weight set as one line per category plus a total
pub fn format_weights(weights: &Weights) -> String {
    CategoryId::ALL
        .iter()
        .map(|category| {
            format!(
                "  {:<18} {:>5}",
                category.as_str(),
                format_weight(weights.get(*category))
            )
        })
        .chain(std::iter::once(format!(
            "  {:<18} {:>5}",
            "total",
            format_weight(weights.total())
        )))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format saved profiles, marking the default (*) and the active one (>)
pub fn format_profile_list(
    profiles: &[ScoringProfile],
    active_id: Option<&str>,
    use_colors: bool,
) -> String {
    if profiles.is_empty() {
        return "No saved profiles.".to_string();
    }

    profiles
        .iter()
        .map(|profile| {
            let active = if active_id == Some(profile.id.as_str()) {
                '>'
            } else {
                ' '
            };
            let default = if profile.is_default { '*' } else { ' ' };
            let description = profile.description.as_deref().unwrap_or("");
            let id = if use_colors {
                profile.id.cyan().to_string()
            } else {
                profile.id.clone()
            };
            format!(
                "{}{} {}  {}  {}  (updated {})",
                active,
                default,
                id,
                profile.name,
                description,
                profile.updated_at.format("%Y-%m-%d %H:%M")
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
