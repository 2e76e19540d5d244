//! HTML report renderer
//!
//! Pure function over the analysis results: no I/O, no state. The
//! caller decides where the document gets written. Every interpolated
//! string goes through [`escape`]; status values double as CSS class
//! names for the colored pills.

use std::path::PathBuf;

use crate::types::{DetectionRow, MappingRow, UseCaseMap, VerificationRow};

const CSS: &str = "body{font-family:system-ui,-apple-system,Segoe UI,Roboto,Arial;margin:24px}\
h1{font-size:28px;margin:0 0 8px}h2{font-size:22px;margin-top:24px;border-bottom:1px solid #eee;padding-bottom:4px}\
table{border-collapse:collapse;width:100%;margin:16px 0}th,td{border:1px solid #ddd;padding:6px 8px;text-align:left;vertical-align:top}\
th{background:#f7f7f7}.tag{display:inline-block;padding:2px 8px;border-radius:999px;font-size:12px}\
.OK{background:#e5f7ea;color:#0c6a2a;border:1px solid #bfe7c9}.NOK{background:#fdecea;color:#8a1c13;border:1px solid #f5c6c2}\
.ERROR{background:#fdecea;color:#8a1c13;border:1px solid #f5c6c2}\
.Fallback{background:#fff7e6;color:#ad6800;border:1px solid #ffe58f}.muted{color:#666}.small{font-size:12px}\
.DETECTABLE{background:#e5f7ea;color:#0c6a2a}.PARTIEL{background:#fff7e6;color:#ad6800}.INDISPONIBLE{background:#fdecea;color:#8a1c13}\
.plot-gallery{display:grid;grid-template-columns:repeat(auto-fit,minmax(400px,1fr));gap:20px;margin:20px 0}\
.plot-item{text-align:center;border:1px solid #ddd;padding:10px;border-radius:8px}\
.plot-item img{max-width:100%;height:auto;border-radius:4px}";

/// Render the full report document.
///
/// `meta` rows keep their given order; `requirements` and `plots` may
/// be empty, in which case their sections are omitted entirely.
pub fn render(
    meta: &[(String, String)],
    uc_table: &[DetectionRow],
    sweet_rows: &[MappingRow],
    uc_map: &UseCaseMap,
    requirements: &[VerificationRow],
    plots: &[PathBuf],
) -> String {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M");

    let meta_rows: String = meta
        .iter()
        .map(|(k, v)| format!("<tr><th>{}</th><td>{}</td></tr>", escape(k), escape(v)))
        .collect();
    let sec1 = format!(
        "<h2>1) Données véhicule</h2><table><tbody>{}<tr><th>Généré le</th><td>{}</td></tr></tbody></table>",
        meta_rows, now
    );

    let sec2 = if uc_table.is_empty() {
        "<h2>2) Use Cases (méthode Feuil3)</h2><p class='muted'>Aucun UC listé dans Feuil3 (ou colonnes 1.x absentes).</p>".to_string()
    } else {
        let rows: String = uc_table
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><span class='tag {status}'>{status}</span></td></tr>",
                    escape(&r.uc),
                    r.required,
                    r.present,
                    escape(&r.missing),
                    status = r.status,
                )
            })
            .collect();
        format!(
            "<h2>2) Use Cases (méthode Feuil3)</h2><table><thead><tr><th>UC</th><th># requis</th><th># présents</th><th>Manquants</th><th>Statut</th></tr></thead><tbody>{}</tbody></table>",
            rows
        )
    };

    let details: String = uc_map
        .iter()
        .map(|(uc, pairs)| {
            let lines: String = pairs
                .iter()
                .map(|(name, bpres)| {
                    format!(
                        "<tr><td>{}</td><td>{}</td></tr>",
                        escape(name),
                        escape(bpres.as_deref().unwrap_or(""))
                    )
                })
                .collect();
            format!(
                "<h3>{}</h3><table><thead><tr><th>internal name</th><th>B_Pres_Sig_UC</th></tr></thead><tbody>{}</tbody></table>",
                escape(uc),
                lines
            )
        })
        .collect();
    let sec3 = format!(
        "<h2>3) Détails par UC</h2>{}",
        if details.is_empty() {
            "<p>(aucun détail)</p>".to_string()
        } else {
            details
        }
    );

    let sec4 = if requirements.is_empty() {
        String::new()
    } else {
        let rows: String = requirements
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td><span class='tag {status}'>{status}</span></td><td>{}</td></tr>",
                    escape(&r.id),
                    escape(&r.label),
                    escape(&r.signals),
                    escape(&r.message),
                    status = r.status,
                )
            })
            .collect();
        format!(
            "<h2>4) Vérification des exigences</h2><table><thead><tr><th>Exigence</th><th>Label</th><th>Signaux</th><th>Status</th><th>Message</th></tr></thead><tbody>{}</tbody></table>",
            rows
        )
    };

    let sec_plots = if plots.is_empty() {
        String::new()
    } else {
        let items: String = plots
            .iter()
            .map(|path| {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let stem = path
                    .file_stem()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!(
                    "<div class='plot-item'><img src='{}' alt='{}'><p>{}</p></div>",
                    escape(&file_name),
                    escape(&stem),
                    escape(&stem)
                )
            })
            .collect();
        format!(
            "<h2>5) Graphiques</h2><div class='plot-gallery'>{}</div>",
            items
        )
    };

    let sweet_headers = [
        "Signal SWEET",
        "Signal MDF trouvé",
        "CAN Fallback",
        "HEVC",
        "Tx/Rx",
        "Domaine",
        "Exigence",
        "MyF2",
        "MyF3",
        "MyF4",
        "MyF5",
        "Statut",
    ];
    let head: String = sweet_headers
        .iter()
        .map(|h| format!("<th>{}</th>", escape(h)))
        .collect();
    let body: String = sweet_rows.iter().map(sweet_row_html).collect();
    let sec6 = format!(
        "<h2>6) SWEET (filtré PVAL) — Statuts</h2><table><thead><tr>{}</tr></thead><tbody>{}</tbody></table><p class='small muted'>OK si « Signal MDF trouvé » présent ; Fallback si « CAN Fallback » présent ; sinon NOK.</p>",
        head, body
    );

    format!(
        "<!doctype html><html lang=fr><head><meta charset='utf-8'/><title>Rapport EVA</title><style>{}</style></head><body><h1>Rapport de Dépouillement Automatique EVA</h1>{}{}{}{}{}{}</body></html>",
        CSS, sec1, sec2, sec3, sec4, sec_plots, sec6
    )
}

fn sweet_row_html(row: &MappingRow) -> String {
    let statut = row
        .statut
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let cells = [
        &row.sweet_name,
        &row.found_name,
        &row.can_fallback,
        &row.hevc,
        &row.tx_rx,
        &row.domaine,
        &row.exigence,
        &row.myf2,
        &row.myf3,
        &row.myf4,
        &row.myf5,
    ];
    let mut tds: String = cells
        .iter()
        .map(|v| format!("<td>{}</td>", escape(v)))
        .collect();
    tds.push_str(&format!(
        "<td><span class='tag {statut}'>{statut}</span></td>",
        statut = escape(&statut)
    ));
    format!("<tr>{}</tr>", tds)
}

/// Minimal HTML escaping for text interpolated into the document
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
