//! Prompts for the two completion calls the pipeline makes.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the structuring prompt is generated from
//!    [`crate::schema::INVOICE_SCHEMA`], so schema evolution never leaves a
//!    stale field list behind in prompt text.
//!
//! 2. **Testability** — unit tests inspect prompts directly without a live
//!    engine, catching regressions like a dropped field or a lost output
//!    constraint.

use crate::schema::{FieldKind, INVOICE_SCHEMA, ITEM_FIELDS};

/// Prompt for the fallback transcription call: the attached image in,
/// complete markdown out. Mirrors what the dedicated OCR endpoint produces
/// so the downstream stages see one text shape regardless of path.
pub const TRANSCRIPTION_PROMPT: &str = r#"You are a document transcription engine. Read the attached receipt or invoice image and transcribe ALL visible text as markdown.

Rules:
- Preserve every character you can read, including invoice numbers, tax IDs, phone numbers, and amounts.
- Keep tables as markdown pipe tables.
- Keep the original language of the document (do not translate).
- Output only the transcription. Do not add commentary, and do not wrap the output in code fences."#;

/// Build the system prompt for the structuring call.
///
/// Enumerates every canonical field with its description, then pins the
/// output contract: one JSON object, no fences, nulls for unknowns, and
/// bilingual guidance for telling the seller from the buyer — the single
/// most common confusion on Chinese VAT invoices.
pub fn structuring_system_prompt() -> String {
    let mut prompt = String::from(
        "You are an invoice data extraction engine. Extract the following fields from the \
         recognized text of a receipt or invoice and return them as JSON.\n\nFields:\n",
    );

    for field in INVOICE_SCHEMA {
        match field.kind {
            FieldKind::Items => {
                prompt.push_str(&format!("- {}: array of objects, each with ", field.name));
                let subs: Vec<String> = ITEM_FIELDS
                    .iter()
                    .map(|(name, desc)| format!("{name} ({desc})"))
                    .collect();
                prompt.push_str(&subs.join(", "));
                prompt.push('\n');
            }
            _ => {
                prompt.push_str(&format!("- {}: {}\n", field.name, field.description));
            }
        }
    }

    prompt.push_str(
        "\nRole guidance / 角色判断:\n\
         - vendorName/vendorTaxId/vendorAddress describe the SELLER — \
           销售方/开票方/收款方, the party issuing the invoice and receiving payment.\n\
         - buyerName/buyerTaxId describe the BUYER — 购买方/付款方/抬头, \
           the party paying. 名称 under 购买方 belongs to the buyer, not the seller.\n\
         - Never swap the two; when in doubt, the header block of a Chinese VAT \
           invoice lists the buyer (购买方) first and the seller (销售方) below.\n\
         \nOutput contract:\n\
         - Return EXACTLY ONE JSON object and nothing else.\n\
         - Do not wrap the JSON in markdown code fences.\n\
         - Use the field names above verbatim.\n\
         - Use null for any field not present in the text.\n\
         - Do not invent values.\n",
    );

    prompt
}

/// Build the user message for the structuring call.
pub fn structuring_user_prompt(recognized_text: &str) -> String {
    format!(
        "Recognized document text:\n\n\"\"\"\n{recognized_text}\n\"\"\"\n\nExtract the fields as JSON."
    )
}
