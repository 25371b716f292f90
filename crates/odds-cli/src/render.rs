//! Plain-text tables for list and detail commands.

use std::collections::BTreeMap;

use odds_core::markdown::{text_direction, TextDirection};
use odds_schema::{DataCatalog, Dataset, Deployment, Resource, QA};

const STAR: char = '★';
const EMPTY_STAR: char = '☆';

/// Cuts to `width` characters so columns stay aligned.
fn fit(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut out: String = flat.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn stars(count: u8) -> String {
    let filled = usize::from(count.min(5));
    let mut out = STAR.to_string().repeat(filled);
    out.push_str(&EMPTY_STAR.to_string().repeat(5 - filled));
    out
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

pub fn print_deployments(deployments: &[Deployment]) {
    println!("{:<20} {:<30} {:<10}", "DEPLOYMENT", "ORGANIZATION", "CATALOGS");
    println!("{}", "-".repeat(62));
    for deployment in deployments {
        println!(
            "{:<20} {:<30} {:<10}",
            fit(&deployment.id, 20),
            fit(or_dash(&deployment.agent_org_name), 30),
            deployment.catalog_ids.len()
        );
    }
}

pub fn print_catalogs(heading: &str, catalogs: &[DataCatalog], counts: &BTreeMap<String, u64>) {
    println!("{heading}");
    println!("{:<24} {:<40} {:>10}", "CATALOG", "TITLE", "DATASETS");
    println!("{}", "-".repeat(76));
    if catalogs.is_empty() {
        println!("(none)");
    }
    for catalog in catalogs {
        let count = counts
            .get(&catalog.id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:<24} {:<40} {:>10}",
            fit(&catalog.id, 24),
            fit(or_dash(&catalog.title), 40),
            count
        );
    }
}

pub fn print_datasets(datasets: &[Dataset], total: u64, page: u32) {
    println!(
        "{:<36} {:<24} {:<16} {:<7}",
        "TITLE", "PUBLISHER", "FORMATS", "QUALITY"
    );
    println!("{}", "-".repeat(86));
    for dataset in datasets {
        let title = dataset.better_title.as_deref().unwrap_or(&dataset.title);
        println!(
            "{:<36} {:<24} {:<16} {}",
            fit(or_dash(title), 36),
            fit(or_dash(&dataset.publisher), 24),
            fit(&dataset.resource_formats().join(","), 16),
            stars(dataset.quality_stars())
        );
    }
    println!("page {page}, {total} datasets in total");
}

pub fn print_questions(questions: &[QA], total: u64, page: u32) {
    println!(
        "{:<17} {:<8} {:>6}  {}",
        "ASKED", "SUCCESS", "SCORE", "QUESTION"
    );
    println!("{}", "-".repeat(80));
    for qa in questions {
        let asked = qa.local_timestamp().unwrap_or_else(|| "-".to_string());
        let score = qa
            .score
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<17} {:<8} {:>6}  {}",
            asked,
            if qa.success { "yes" } else { "no" },
            score,
            fit(&qa.question, 60)
        );
    }
    println!("page {page}, {total} questions in total");
}

pub fn print_dataset(dataset: &Dataset) {
    let title = dataset.better_title.as_deref().unwrap_or(&dataset.title);
    println!("Dataset: {}", or_dash(title));
    println!("Id: {}", dataset.id);
    println!("Publisher: {}", or_dash(&dataset.publisher));
    if let Some(link) = &dataset.link {
        println!("Link: {link}");
    }
    println!("Quality: {}", stars(dataset.quality_stars()));
    for issue in &dataset.quality_issues {
        println!("  - {}: {}", issue.issue, issue.description);
    }
    let description = dataset
        .better_description
        .as_deref()
        .unwrap_or(&dataset.description);
    if !description.trim().is_empty() {
        println!();
        println!("{}", description.trim());
    }
    if dataset.resources.is_empty() {
        return;
    }
    println!();
    println!("{:<4} {:<8} {:<10} {:>10}  {}", "#", "FORMAT", "STATUS", "ROWS", "URL");
    for (index, resource) in dataset.resources.iter().enumerate() {
        println!(
            "{:<4} {:<8} {:<10} {:>10}  {}",
            index,
            fit(or_dash(&resource.file_format), 8),
            resource.fetch_status().label(),
            resource
                .row_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            resource.url
        );
    }
}

pub fn print_resource(resource: &Resource) {
    println!("Resource: {}", or_dash(&resource.title));
    println!("Url: {}", resource.url);
    println!("Status: {}", resource.fetch_status().label());
    if let Some(error) = resource.loading_error.as_deref().filter(|e| !e.trim().is_empty()) {
        println!("Error: {error}");
    }
    if resource.fields.is_empty() {
        return;
    }
    println!();
    println!("{:<24} {:<12} {}", "FIELD", "TYPE", "DESCRIPTION");
    for field in &resource.fields {
        println!(
            "{:<24} {:<12} {}",
            fit(&field.name, 24),
            fit(or_dash(&field.data_type), 12),
            field.description.as_deref().unwrap_or("-")
        );
    }
}

/// Right-to-left text is marked so terminals with bidi support lay it out.
pub fn directional(text: &str) -> String {
    match text_direction(text) {
        TextDirection::Rtl => format!("\u{202B}{text}\u{202C}"),
        TextDirection::Ltr => text.to_string(),
    }
}
