//! Printable intervention report.
//!
//! Plain text with a fixed page length; each page ends with a `Page n/m`
//! footer and pages are separated by a form feed.

use chrono::{DateTime, Utc};

use crate::intervention::InterventionDetail;

/// Letterhead and page geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub company: String,
    pub tagline: String,
    pub phone: String,
    pub email: String,
    /// Lines per page, footer included.
    pub page_lines: usize,
    pub width: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            company: "ENTREPRISE GALAND".to_string(),
            tagline: "Plomberie & Chauffage".to_string(),
            phone: "01 23 45 67 89".to_string(),
            email: "contact@galand-plomberie.fr".to_string(),
            page_lines: 60,
            width: 80,
        }
    }
}

const FOOTER_LINES: usize = 2;

pub fn render_report(
    detail: &InterventionDetail,
    generated_at: DateTime<Utc>,
    options: &ReportOptions,
) -> String {
    let body = body_lines(detail, generated_at, options);
    paginate(body, options)
}

fn body_lines(
    detail: &InterventionDetail,
    generated_at: DateTime<Utc>,
    options: &ReportOptions,
) -> Vec<String> {
    let width = options.width.max(40);
    let i = &detail.intervention;
    let c = &detail.client;
    let mut out = Vec::new();

    for line in [&options.company, &options.tagline] {
        out.push(center(line, width));
    }
    out.push(center(&format!("Tel: {}", options.phone), width));
    out.push(center(&format!("Email: {}", options.email), width));
    out.push(String::new());
    out.push(format!("Rapport d'intervention N° {}", i.id));
    out.push("=".repeat(width));
    out.push(String::new());

    heading(&mut out, "Informations client");
    out.push(format!("Nom: {}", c.full_name()));
    out.push(format!("Téléphone: {}", c.phone));
    if let Some(email) = &c.email {
        out.push(format!("Email: {email}"));
    }
    out.push(format!("Adresse: {}", c.address));
    if let (Some(city), Some(postal_code)) = (&c.city, &c.postal_code) {
        out.push(format!("{postal_code} {city}"));
    }
    out.push(String::new());

    heading(&mut out, "Détails de l'intervention");
    out.push(format!("Date: {}", i.intervention_date.format("%d/%m/%Y")));
    if let Some(time) = i.intervention_time {
        out.push(format!("Heure: {}", time.format("%H:%M")));
    }
    out.push(format!("Type: {}", i.kind));
    out.push(format!("Statut: {}", i.status));
    if i.is_urgent {
        out.push("*** URGENT ***".to_string());
    }
    if let Some(plumber) = &detail.plumber {
        out.push(format!("Plombier: {}", plumber.full_name()));
    }
    out.push(String::new());

    heading(&mut out, "Description du problème");
    out.extend(wrap(&i.problem_description, width));
    out.push(String::new());

    if let Some(work_done) = &i.work_done {
        heading(&mut out, "Travaux effectués");
        out.extend(wrap(work_done, width));
        out.push(String::new());
    }

    if !detail.materials.is_empty() {
        heading(&mut out, "Pièces utilisées");
        out.push(format!(
            "{:<28} {:<14} {:>6} {:>12} {:>12}",
            "Article", "Réf.", "Qté", "P.U.", "Total"
        ));
        out.push("-".repeat(width.min(76)));
        for m in &detail.materials {
            out.push(format!(
                "{:<28} {:<14} {:>6} {:>12} {:>12}",
                truncate(&m.name, 28),
                truncate(m.reference.as_deref().unwrap_or("-"), 14),
                m.record.quantity,
                format!("{} €", m.record.unit_price),
                format!("{} €", m.record.line_total()),
            ));
        }
        out.push(String::new());
    }

    heading(&mut out, "Récapitulatif financier");
    if let Some(hours) = i.time_spent {
        out.push(format!("Temps passé: {hours} heures"));
    }
    if let Some(labor) = i.labor_cost.filter(|m| !m.is_zero()) {
        out.push(format!("Main d'oeuvre: {labor} €"));
    }
    if !i.materials_cost.is_zero() {
        out.push(format!("Fournitures: {} €", i.materials_cost));
    }
    out.push(format!("TOTAL: {} € TTC", i.total_cost));

    if let Some(notes) = &i.notes {
        out.push(String::new());
        heading(&mut out, "Notes");
        out.extend(wrap(notes, width));
    }

    out.push(String::new());
    out.push(center(
        &format!(
            "Document généré le {}",
            generated_at.format("%d/%m/%Y à %H:%M:%S")
        ),
        width,
    ));
    out
}

fn heading(out: &mut Vec<String>, title: &str) {
    out.push(title.to_string());
    out.push("-".repeat(title.chars().count()));
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let pad = width.saturating_sub(len) / 2;
    format!("{}{text}", " ".repeat(pad))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// Greedy word wrap; explicit newlines are kept.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if !current.is_empty() && needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn paginate(body: Vec<String>, options: &ReportOptions) -> String {
    let per_page = options.page_lines.saturating_sub(FOOTER_LINES).max(1);
    let pages: Vec<&[String]> = body.chunks(per_page).collect();
    let total = pages.len().max(1);
    let width = options.width.max(40);

    let mut out = String::new();
    for (n, page) in pages.iter().enumerate() {
        if n > 0 {
            out.push('\u{c}');
        }
        for line in page.iter() {
            out.push_str(line);
            out.push('\n');
        }
        for _ in page.len()..per_page {
            out.push('\n');
        }
        out.push('\n');
        let footer = format!("Page {}/{}", n + 1, total);
        out.push_str(&format!("{footer:>width$}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::{Assignee, Intervention, InterventionDraft};
    use crate::material::{MaterialDetail, MaterialLine, MaterialRecord};
    use fieldops_clients::{Client, ClientDetails};
    use fieldops_core::{ClientId, InterventionId, InventoryItemId, Money, UserId};
    use serde_json::json;

    fn detail(notes: &str) -> InterventionDetail {
        let now = Utc::now();
        let client = Client::new(
            ClientId::new(),
            ClientDetails {
                first_name: Some("Marie".into()),
                last_name: Some("Curie".into()),
                phone: Some("0601020304".into()),
                address: Some("1 rue des Écoles".into()),
                city: Some("Paris".into()),
                postal_code: Some("75005".into()),
                ..ClientDetails::default()
            }
            .validate()
            .unwrap(),
            now,
        );
        let draft: InterventionDraft = serde_json::from_value(json!({
            "client_id": client.id.to_string(),
            "intervention_date": "2026-10-02",
            "type": "Fuite",
            "problem_description": "Fuite sous l'évier",
            "labor_cost": 50,
            "is_urgent": true,
            "notes": notes,
        }))
        .unwrap();
        let mut fields = draft.validate().unwrap();
        let line = MaterialLine {
            inventory_id: InventoryItemId::new(),
            quantity: 2,
            unit_price: Money::from_major(5),
        };
        fields.materials = vec![line.clone()];
        let intervention = Intervention::new(InterventionId::new(), &fields, now);
        let record = MaterialRecord::new(intervention.id, &line, now);
        InterventionDetail {
            intervention,
            client,
            plumber: Some(Assignee {
                id: UserId::new(),
                first_name: "Jean".into(),
                last_name: "Dupont".into(),
            }),
            materials: vec![MaterialDetail {
                record,
                name: "Joint fibre".into(),
                reference: Some("JF-12".into()),
                item_unit_price: Some(Money::from_major(6)),
            }],
        }
    }

    #[test]
    fn single_page_report_has_all_sections() {
        let text = render_report(&detail("RAS"), Utc::now(), &ReportOptions::default());
        assert!(text.contains("ENTREPRISE GALAND"));
        assert!(text.contains("Nom: Marie Curie"));
        assert!(text.contains("75005 Paris"));
        assert!(text.contains("Plombier: Jean Dupont"));
        assert!(text.contains("*** URGENT ***"));
        assert!(text.contains("Joint fibre"));
        assert!(text.contains("10.00 €"));
        assert!(text.contains("TOTAL: 60.00 € TTC"));
        assert!(text.contains("Page 1/1"));
        assert!(!text.contains('\u{c}'));
    }

    #[test]
    fn long_notes_spill_onto_more_pages() {
        let notes = "mot ".repeat(2_000);
        let options = ReportOptions {
            page_lines: 30,
            ..ReportOptions::default()
        };
        let text = render_report(&detail(&notes), Utc::now(), &options);
        let pages: Vec<&str> = text.split('\u{c}').collect();
        assert!(pages.len() > 1);
        let total = pages.len();
        for (n, page) in pages.iter().enumerate() {
            assert_eq!(page.lines().count(), options.page_lines);
            assert!(page.contains(&format!("Page {}/{}", n + 1, total)));
        }
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("aaa bbb ccc ddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }
}
