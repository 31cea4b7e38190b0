//! Record types and rdata field mapping.
//!
//! Vendors hand over rdata as an ordered list of strings (one per field, or
//! one space-separated string). The unified model stores each record as a
//! field name -> value map.

use std::collections::BTreeMap;

use thiserror::Error;

/// One record's data, keyed by field name (e.g. `address`, `preference`).
pub type RData = BTreeMap<String, String>;

/// Numeric type codes and mnemonics of the record types adapters commonly
/// deal in.
const RECORD_TYPES: &[(u16, &str)] = &[
    (1, "A"),
    (2, "NS"),
    (5, "CNAME"),
    (6, "SOA"),
    (12, "PTR"),
    (15, "MX"),
    (16, "TXT"),
    (28, "AAAA"),
    (33, "SRV"),
    (35, "NAPTR"),
    (37, "CERT"),
    (43, "DS"),
    (44, "SSHFP"),
    (99, "SPF"),
    (257, "CAA"),
];

/// Field names per record type, in wire order.
fn fields_for(record_type: &str) -> Option<&'static [&'static str]> {
    let fields: &'static [&'static str] = match record_type {
        "A" | "AAAA" => &["address"],
        "CNAME" => &["cname"],
        "NS" => &["nsdname"],
        "PTR" => &["ptrdname"],
        "TXT" | "SPF" => &["txtdata"],
        "MX" => &["preference", "exchange"],
        "SRV" => &["priority", "weight", "port", "target"],
        "CAA" => &["flags", "tag", "value"],
        "SSHFP" => &["algorithm", "fptype", "fingerprint"],
        "DS" => &["keyTag", "algorithm", "digestType", "digest"],
        "CERT" => &["format", "tag", "algorithm", "certificate"],
        "NAPTR" => &[
            "order",
            "preference",
            "flags",
            "services",
            "regexp",
            "replacement",
        ],
        "SOA" => &[
            "mname", "rname", "serial", "refresh", "retry", "expire", "minimum",
        ],
        _ => return None,
    };
    Some(fields)
}

/// Field name used for types without a known layout.
const OPAQUE_FIELD: &str = "rdata";

/// Mnemonic for a numeric type code; `TYPEnnn` for unknown codes.
pub fn type_name(code: u16) -> String {
    RECORD_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or_else(|| format!("TYPE{code}"), |(_, name)| (*name).to_string())
}

/// Numeric type code for a mnemonic (case-insensitive), including `TYPEnnn`.
pub fn type_code(name: &str) -> Option<u16> {
    let upper = name.to_ascii_uppercase();
    RECORD_TYPES
        .iter()
        .find(|(_, n)| *n == upper)
        .map(|(c, _)| *c)
        .or_else(|| upper.strip_prefix("TYPE").and_then(|n| n.parse().ok()))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RDataError {
    #[error("{record_type} expects {expected} rdata fields, got {actual}")]
    FieldCount {
        record_type: String,
        expected: usize,
        actual: usize,
    },
    #[error("{record_type} rdata is missing field '{field}'")]
    MissingField {
        record_type: String,
        field: &'static str,
    },
    #[error("empty rdata for {record_type}")]
    Empty { record_type: String },
}

/// Map positional vendor values onto the named fields of `record_type`.
///
/// When the type has several fields and the vendor sent a single string,
/// that string is split on whitespace into at most as many parts as there
/// are fields; the last field keeps its inner whitespace. Text types keep
/// their single value as-is. Unknown types keep the values joined under one opaque field.
pub fn from_values(record_type: &str, values: &[String]) -> Result<RData, RDataError> {
    if values.is_empty() {
        return Err(RDataError::Empty {
            record_type: record_type.to_string(),
        });
    }

    let Some(fields) = fields_for(record_type) else {
        return Ok(RData::from([(OPAQUE_FIELD.to_string(), values.join(" "))]));
    };

    let split: Vec<String>;
    let values = if values.len() == 1 && fields.len() > 1 {
        split = split_fields(&values[0], fields.len());
        &split[..]
    } else if fields.len() == 1 && values.len() > 1 {
        // TXT may arrive as several character-strings
        return Ok(RData::from([(fields[0].to_string(), values.join(" "))]));
    } else {
        values
    };

    if values.len() != fields.len() {
        return Err(RDataError::FieldCount {
            record_type: record_type.to_string(),
            expected: fields.len(),
            actual: values.len(),
        });
    }

    Ok(fields
        .iter()
        .zip(values)
        .map(|(field, value)| ((*field).to_string(), value.clone()))
        .collect())
}

/// Split `value` into at most `n` whitespace-separated parts.
fn split_fields(value: &str, n: usize) -> Vec<String> {
    let mut parts = Vec::with_capacity(n);
    let mut rest = value.trim();
    while parts.len() + 1 < n && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        parts.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}

/// Inverse of [`from_values`]: the field values in wire order.
pub fn to_values(record_type: &str, rdata: &RData) -> Result<Vec<String>, RDataError> {
    let Some(fields) = fields_for(record_type) else {
        return rdata
            .get(OPAQUE_FIELD)
            .map(|v| vec![v.clone()])
            .ok_or_else(|| RDataError::MissingField {
                record_type: record_type.to_string(),
                field: OPAQUE_FIELD,
            });
    };

    fields
        .iter()
        .map(|field| {
            rdata
                .get(*field)
                .cloned()
                .ok_or_else(|| RDataError::MissingField {
                    record_type: record_type.to_string(),
                    field: *field,
                })
        })
        .collect()
}

/// Build rdata from `(field, value)` pairs.
pub fn rdata<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> RData
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn type_names_round_trip() {
        assert_eq!(type_name(1), "A");
        assert_eq!(type_name(28), "AAAA");
        assert_eq!(type_code("aaaa"), Some(28));
        assert_eq!(type_code("MX"), Some(15));
    }

    #[test]
    fn unknown_type_code_uses_generic_mnemonic() {
        assert_eq!(type_name(65), "TYPE65");
        assert_eq!(type_code("TYPE65"), Some(65));
        assert_eq!(type_code("BOGUS"), None);
    }

    #[test]
    fn a_record() {
        let r = from_values("A", &values(&["192.0.2.1"])).unwrap();
        assert_eq!(r, rdata([("address", "192.0.2.1")]));
    }

    #[test]
    fn mx_from_separate_values() {
        let r = from_values("MX", &values(&["10", "mx.example.io."])).unwrap();
        assert_eq!(r["preference"], "10");
        assert_eq!(r["exchange"], "mx.example.io.");
    }

    #[test]
    fn srv_from_single_string() {
        let r = from_values("SRV", &values(&["0 1 80 www.example.io."])).unwrap();
        assert_eq!(r["priority"], "0");
        assert_eq!(r["weight"], "1");
        assert_eq!(r["port"], "80");
        assert_eq!(r["target"], "www.example.io.");
    }

    #[test]
    fn txt_keeps_spaces() {
        let r = from_values("TXT", &values(&["v=spf1 -all"])).unwrap();
        assert_eq!(r["txtdata"], "v=spf1 -all");
    }

    #[test]
    fn caa_value_keeps_inner_spaces() {
        let r = from_values("CAA", &values(&["0  issue \"ca.example.net; account=a b\""])).unwrap();
        assert_eq!(r["flags"], "0");
        assert_eq!(r["tag"], "issue");
        assert_eq!(r["value"], "\"ca.example.net; account=a b\"");
    }

    #[test]
    fn field_count_mismatch() {
        let err = from_values("MX", &values(&["10"])).unwrap_err();
        assert_eq!(
            err,
            RDataError::FieldCount {
                record_type: "MX".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn empty_values_rejected() {
        assert!(matches!(
            from_values("A", &[]),
            Err(RDataError::Empty { .. })
        ));
    }

    #[test]
    fn unknown_type_is_opaque() {
        let r = from_values("TYPE65", &values(&["1", ". alpn=h2"])).unwrap();
        assert_eq!(r, rdata([("rdata", "1 . alpn=h2")]));
        assert_eq!(to_values("TYPE65", &r).unwrap(), values(&["1 . alpn=h2"]));
    }

    #[test]
    fn to_values_in_wire_order() {
        let r = rdata([("exchange", "mx.example.io."), ("preference", "10")]);
        assert_eq!(
            to_values("MX", &r).unwrap(),
            values(&["10", "mx.example.io."])
        );
    }

    #[test]
    fn to_values_missing_field() {
        let r = rdata([("exchange", "mx.example.io.")]);
        assert!(matches!(
            to_values("MX", &r),
            Err(RDataError::MissingField {
                field: "preference",
                ..
            })
        ));
    }
}
