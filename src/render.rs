// Markup fragments for each README section

use crate::classifier::{Bucket, Buckets, Progress};
use crate::readme::Section;

pub const TAG_PROGRESS: &str = "PROGRESS";
pub const TAG_CURSUS: &str = "CURSUS";
pub const TAG_PISCINE: &str = "PISCINE";
pub const TAG_COMPLETED: &str = "COMPLETED";
pub const TAG_INPROGRESS: &str = "INPROGRESS";

/// Fragments for every recognized tag, in a fixed order
pub fn render_sections(buckets: &Buckets) -> Vec<Section> {
    vec![
        Section::new(TAG_PROGRESS, render_progress_bar(buckets.progress())),
        Section::new(TAG_CURSUS, render_project_list(&buckets.cursus)),
        Section::new(TAG_PISCINE, render_project_list(&buckets.piscine)),
        Section::new(TAG_COMPLETED, render_completed_list(&buckets.completed)),
        Section::new(TAG_INPROGRESS, render_in_progress_list(&buckets.in_progress)),
    ]
}

pub fn render_progress_bar(progress: Progress) -> String {
    let percentage = progress.percentage();
    format!(
        r#"<div style="background:#eee; border-radius:12px; overflow:hidden; width:100%; max-width:500px; margin-bottom:1em;">
  <div style="width:{pct}%; background:#4CAF50; color:white; text-align:center; padding:8px 0; font-weight:bold;">
    Level {done} / {total} ({pct}%)
  </div>
</div>"#,
        pct = percentage,
        done = progress.done,
        total = progress.total,
    )
}

/// HTML list with a done/in-progress symbol and the mark
pub fn render_project_list(bucket: &Bucket) -> String {
    if bucket.is_empty() {
        return "<p style='font-style:italic; color:#666;'>No projects yet</p>".to_string();
    }

    let mut html = String::from("<ul>\n");
    for project in &bucket.projects {
        let symbol = if project.validated { "✅" } else { "🚧" };
        html.push_str(&format!(
            "<li><strong>{}</strong> — {} {}</li>\n",
            escape_html(&project.name),
            symbol,
            project.mark
        ));
    }
    html.push_str("</ul>");
    html
}

/// Markdown list of completed projects
pub fn render_completed_list(bucket: &Bucket) -> String {
    if bucket.is_empty() {
        return "_No completed projects yet._".to_string();
    }

    bucket
        .projects
        .iter()
        .map(|p| format!("- **{}** — ✅ ({})", p.name, p.mark))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown list of ongoing projects with their API status
pub fn render_in_progress_list(bucket: &Bucket) -> String {
    if bucket.is_empty() {
        return "_No ongoing projects._".to_string();
    }

    bucket
        .projects
        .iter()
        .map(|p| format!("- **{}** — 🚧 ({})", p.name, p.status.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
