//! The extraction schema as data.
//!
//! One table drives everything that needs to know the canonical field set:
//! the structuring prompt ([`crate::prompts`]), alias folding and value
//! normalization ([`crate::pipeline::extract`]), and the completeness check
//! used by callers to gate persistence. Adding or renaming a field touches
//! exactly this file.

use serde_json::{Map, Value};

/// Value class of a schema field, used by prompt building and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, trimmed.
    Text,
    /// Monetary amount, normalized to a JSON number.
    Amount,
    /// Date, normalized to `YYYY-MM-DD` where recognizable.
    Date,
    /// Array of line items.
    Items,
}

/// One canonical field of the extraction schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    /// Canonical name as it appears in the final structured object.
    pub name: &'static str,
    pub kind: FieldKind,
    /// Natural-language description fed to the structuring prompt.
    pub description: &'static str,
    /// Non-canonical names the structuring model is known to emit.
    /// Folded into `name` when it is still empty, deleted otherwise.
    pub aliases: &'static [&'static str],
}

/// Sub-fields of each entry in `items`.
pub const ITEM_FIELDS: &[(&str, &str)] = &[
    ("name", "item or service name"),
    ("unitPrice", "unit price as a number"),
    ("quantity", "quantity as a number"),
    ("amount", "line amount excluding tax"),
    ("taxRate", "tax rate, e.g. \"13%\""),
    ("taxAmount", "line tax amount"),
];

/// The fixed, versioned invoice schema.
pub const INVOICE_SCHEMA: &[SchemaField] = &[
    SchemaField {
        name: "invoiceNumber",
        kind: FieldKind::Text,
        description: "invoice number (发票号码)",
        aliases: &["Invoice Number", "Invoice No"],
    },
    SchemaField {
        name: "invoiceCode",
        kind: FieldKind::Text,
        description: "invoice code (发票代码)",
        aliases: &["Invoice Code"],
    },
    SchemaField {
        name: "invoiceDate",
        kind: FieldKind::Date,
        description: "issue date (开票日期), formatted YYYY-MM-DD",
        aliases: &["Invoice Date", "Date"],
    },
    SchemaField {
        name: "invoiceType",
        kind: FieldKind::Text,
        description: "invoice type, e.g. 增值税电子普通发票 / VAT invoice",
        aliases: &["Invoice Type"],
    },
    SchemaField {
        name: "amount",
        kind: FieldKind::Amount,
        description: "amount excluding tax (不含税金额)",
        aliases: &["Amount"],
    },
    SchemaField {
        name: "taxAmount",
        kind: FieldKind::Amount,
        description: "tax amount (税额); 0 when tax-exempt (免税)",
        aliases: &["Tax Amount", "Tax"],
    },
    SchemaField {
        name: "totalAmount",
        kind: FieldKind::Amount,
        description: "total including tax (价税合计)",
        aliases: &["Total Amount", "Total"],
    },
    SchemaField {
        name: "currency",
        kind: FieldKind::Text,
        description: "currency code or symbol, e.g. CNY, ¥",
        aliases: &["Currency"],
    },
    SchemaField {
        name: "vendorName",
        kind: FieldKind::Text,
        description: "seller / vendor name (销售方名称)",
        aliases: &["Seller", "Vendor", "Merchant", "Seller Name"],
    },
    SchemaField {
        name: "vendorTaxId",
        kind: FieldKind::Text,
        description: "seller taxpayer identification number (销售方纳税人识别号)",
        aliases: &["Seller Tax ID", "Vendor Tax ID"],
    },
    SchemaField {
        name: "vendorAddress",
        kind: FieldKind::Text,
        description: "seller address and phone (销售方地址、电话)",
        aliases: &["Seller Address", "Vendor Address"],
    },
    SchemaField {
        name: "buyerName",
        kind: FieldKind::Text,
        description: "buyer / purchaser name (购买方名称)",
        aliases: &["Buyer", "Purchaser", "Customer", "Buyer Name"],
    },
    SchemaField {
        name: "buyerTaxId",
        kind: FieldKind::Text,
        description: "buyer taxpayer identification number (购买方纳税人识别号)",
        aliases: &["Buyer Tax ID"],
    },
    SchemaField {
        name: "issuer",
        kind: FieldKind::Text,
        description: "person who issued the invoice (开票人)",
        aliases: &["Issuer"],
    },
    SchemaField {
        name: "totalAmountInWords",
        kind: FieldKind::Text,
        description: "total in words (价税合计大写), e.g. 壹佰元整",
        aliases: &["Total Amount In Words", "Amount In Words"],
    },
    SchemaField {
        name: "items",
        kind: FieldKind::Items,
        description: "line items",
        aliases: &["Items", "Line Items"],
    },
];

/// Look up a canonical field by name.
pub fn field(name: &str) -> Option<&'static SchemaField> {
    INVOICE_SCHEMA.iter().find(|f| f.name == name)
}

// ── Completeness check ───────────────────────────────────────────────────

/// Fields that must be non-empty for a recognition to count as complete.
const REQUIRED_FIELDS: &[&str] = &["invoiceNumber", "invoiceDate", "vendorTaxId", "buyerTaxId"];

/// Fields counted toward the minimum of [`MIN_VALID_CRITICAL_FIELDS`].
const CRITICAL_FIELDS: &[&str] = &[
    "invoiceNumber",
    "invoiceDate",
    "vendorName",
    "vendorTaxId",
    "buyerName",
    "buyerTaxId",
    "totalAmount",
];

/// At least this many critical fields must hold a value.
const MIN_VALID_CRITICAL_FIELDS: usize = 5;

/// Outcome of [`is_recognition_complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completeness {
    pub complete: bool,
    /// Required/critical fields found empty, for caller diagnostics.
    pub missing_fields: Vec<String>,
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Check whether a structured extraction carries enough of the key fields
/// to be trusted by a persistence layer.
///
/// Required fields (invoice number, date, both tax IDs) must all be present;
/// beyond that, at least five of the seven critical fields must hold a value.
pub fn is_recognition_complete(invoice_data: &Map<String, Value>) -> Completeness {
    let missing_required: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !has_value(invoice_data.get(**f)))
        .map(|f| f.to_string())
        .collect();

    if !missing_required.is_empty() {
        return Completeness {
            complete: false,
            missing_fields: missing_required,
        };
    }

    let mut valid = 0usize;
    let mut missing = Vec::new();
    for f in CRITICAL_FIELDS {
        if has_value(invoice_data.get(*f)) {
            valid += 1;
        } else {
            missing.push(f.to_string());
        }
    }

    if valid >= MIN_VALID_CRITICAL_FIELDS {
        Completeness {
            complete: true,
            missing_fields: Vec::new(),
        }
    } else {
        Completeness {
            complete: false,
            missing_fields: missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn alias_keys_are_distinct_from_canonical_names() {
        for field in INVOICE_SCHEMA {
            for alias in field.aliases {
                assert!(
                    INVOICE_SCHEMA.iter().all(|f| f.name != *alias),
                    "alias {alias} collides with a canonical field name"
                );
            }
        }
    }

    #[test]
    fn complete_invoice_passes() {
        let data = map(json!({
            "invoiceNumber": "12345678",
            "invoiceDate": "2024-03-01",
            "vendorName": "Acme Co",
            "vendorTaxId": "91110000AAAA",
            "buyerName": "Globex",
            "buyerTaxId": "91110000BBBB",
            "totalAmount": 113.0,
        }));
        let c = is_recognition_complete(&data);
        assert!(c.complete);
        assert!(c.missing_fields.is_empty());
    }

    #[test]
    fn missing_required_field_fails() {
        let data = map(json!({
            "invoiceNumber": "12345678",
            "invoiceDate": "2024-03-01",
            "vendorTaxId": "91110000AAAA",
            "totalAmount": 113.0,
        }));
        let c = is_recognition_complete(&data);
        assert!(!c.complete);
        assert_eq!(c.missing_fields, vec!["buyerTaxId".to_string()]);
    }

    #[test]
    fn zero_amount_does_not_count_as_value() {
        let data = map(json!({
            "invoiceNumber": "1",
            "invoiceDate": "2024-01-01",
            "vendorTaxId": "a",
            "buyerTaxId": "b",
            "vendorName": "",
            "buyerName": "",
            "totalAmount": 0,
        }));
        // Required fields present, but only 4 of 7 critical fields hold values.
        let c = is_recognition_complete(&data);
        assert!(!c.complete);
    }
}
