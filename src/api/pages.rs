//! HTML rendering for the clinic-facing pages
//!
//! Plain string building; every interpolated value goes through
//! `escape_html`. Flash banners are rendered directly into the page that
//! answers the request, there is no session to carry them across a redirect.

use crate::baas::VerifyMode;
use crate::prescription::{Prescription, Status};

/// A user-facing banner: kind is `success`, `info` or `error`.
#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: &'static str,
    pub text: String,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Flash { kind: "success", text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Flash { kind: "info", text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Flash { kind: "error", text: text.into() }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "body{font-family:sans-serif;max-width:60em;margin:2em auto;padding:0 1em}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ccc;padding:.4em;text-align:left}\
.flash{padding:.6em 1em;margin:.5em 0;border-radius:4px}\
.flash.success{background:#e6f4e6}.flash.info{background:#e6eef8}.flash.error{background:#f8e6e6}\
.status{padding:.1em .5em;border-radius:4px}\
.status.pending{background:#f3e8c8}.status.confirmed{background:#cdeacd}.status.failed{background:#eecaca}\
label{display:block;margin:.4em 0 .1em}input,select,textarea{width:100%;max-width:30em}";

fn banner_block(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|flash| {
            format!(
                "<div class=\"flash {}\">{}</div>\n",
                flash.kind,
                escape_html(&flash.text)
            )
        })
        .collect()
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

fn status_badge(status: Status) -> &'static str {
    match status {
        Status::Pending => "<span class=\"status pending\">pending</span>",
        Status::Confirmed => "<span class=\"status confirmed\">confirmed</span>",
        Status::Failed => "<span class=\"status failed\">failed</span>",
    }
}

fn prescription_row(p: &Prescription) -> String {
    let tx_cell = match (&p.blockchain_tx_id, &p.explorer_url) {
        (Some(tx), Some(url)) => format!(
            "<a href=\"{}\">{}</a> (<a href=\"/verify_prescription?tx_id={}\">verify</a>)",
            escape_html(url),
            escape_html(tx),
            escape_html(tx)
        ),
        (Some(tx), None) => format!(
            "{} (<a href=\"/verify_prescription?tx_id={}\">verify</a>)",
            escape_html(tx),
            escape_html(tx)
        ),
        _ => "-".to_string(),
    };
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        p.id,
        escape_html(&p.data_id),
        escape_html(&p.patient_full_name),
        escape_html(&p.medication_name),
        status_badge(p.status),
        escape_html(p.baas_task_id.as_deref().unwrap_or("-")),
        tx_cell
    )
}

fn registration_form() -> &'static str {
    concat!(
        "<h2>Register a prescription</h2>\n",
        "<form method=\"post\" action=\"/register_prescription\">\n",
        "<label>Patient full name *</label><input name=\"patient_full_name\">\n",
        "<label>Date of birth *</label><input name=\"patient_dob\" placeholder=\"YYYY-MM-DD\">\n",
        "<label>Prescription date</label><input name=\"prescription_date\" placeholder=\"YYYY-MM-DD\">\n",
        "<label>Medication *</label><input name=\"medication_name\">\n",
        "<label>Dosage strength</label><input name=\"dosage_strength\">\n",
        "<label>Route of administration</label><input name=\"route_of_administration\">\n",
        "<label>Frequency / duration</label><input name=\"frequency_duration\">\n",
        "<label>Quantity to dispense</label><input name=\"quantity_to_dispense\">\n",
        "<label>Refill info</label><input name=\"refill_info\">\n",
        "<label>Prescriber signature</label><input name=\"prescriber_signature\">\n",
        "<p><button type=\"submit\">Register</button></p>\n",
        "</form>\n"
    )
}

/// The landing page: banners, the registration form, and the registered
/// prescriptions newest tracking id first.
pub fn index_page(prescriptions: &[Prescription], flashes: &[Flash]) -> String {
    let mut body = String::new();
    body.push_str("<h1>Prescription Registry</h1>\n");
    body.push_str(&banner_block(flashes));
    body.push_str(registration_form());
    body.push_str("<h2>Registered prescriptions</h2>\n");
    if prescriptions.is_empty() {
        body.push_str("<p>No prescriptions registered yet.</p>\n");
    } else {
        body.push_str(
            "<table>\n<tr><th>#</th><th>Tracking ID</th><th>Patient</th><th>Medication</th>\
<th>Status</th><th>Task ID</th><th>Transaction</th></tr>\n",
        );
        for prescription in prescriptions {
            body.push_str(&prescription_row(prescription));
        }
        body.push_str("</table>\n");
    }
    body.push_str("<p><a href=\"/verify_prescription\">Verify a transaction</a> · <a href=\"/prescriptions_json\">JSON listing</a></p>\n");
    page("Prescription Registry", &body)
}

/// The verification page: the form (pre-fillable), banners, and the raw
/// provider response from the last attempt when there is one.
pub fn verify_page(tx_id: &str, mode: VerifyMode, flashes: &[Flash], raw_result: Option<&str>) -> String {
    let (payload_selected, hash_selected) = match mode {
        VerifyMode::Payload => (" selected", ""),
        VerifyMode::Hash => ("", " selected"),
    };
    let mut body = String::new();
    body.push_str("<h1>Verify a prescription transaction</h1>\n");
    body.push_str(&banner_block(flashes));
    body.push_str(&format!(
        concat!(
            "<form method=\"post\" action=\"/verify_prescription\">\n",
            "<label>Transaction ID *</label><input name=\"transactionId\" value=\"{}\">\n",
            "<label>Verification mode</label>\n",
            "<select name=\"verification_type\">\n",
            "<option value=\"payload\"{}>Full JSON payload</option>\n",
            "<option value=\"hash\"{}>Payload hash</option>\n",
            "</select>\n",
            "<label>JSON payload (payload mode)</label><textarea name=\"jsonPayload\" rows=\"6\"></textarea>\n",
            "<label>Payload hash (hash mode)</label><input name=\"jsonPayloadHash\">\n",
            "<p><button type=\"submit\">Verify</button></p>\n",
            "</form>\n"
        ),
        escape_html(tx_id),
        payload_selected,
        hash_selected
    ));
    if let Some(raw) = raw_result {
        body.push_str("<h2>Provider response</h2>\n<pre>");
        body.push_str(&escape_html(raw));
        body.push_str("</pre>\n");
    }
    body.push_str("<p><a href=\"/\">Back to registry</a></p>\n");
    page("Verify Prescription", &body)
}
