use std::sync::Arc;

use crate::error::{ClassifiedError, Result, VendorMessage};
use crate::session::SessionSettings;
use crate::types::{
    Credentials, GroupDetail, Page, PageRequest, ProviderMetadata, RecordEntry, Zone,
};

/// A vendor's error payload, decoded by the adapter but not yet classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawApiError {
    /// Primary error code (format differs per vendor).
    pub code: Option<String>,
    /// Primary error message.
    pub message: String,
    /// Every message line the vendor returned, in order.
    pub messages: Vec<VendorMessage>,
    /// HTTP status of the response, when the transport has one.
    pub http_status: Option<u16>,
    /// Vendor hint for how long to back off, in seconds.
    pub retry_after_secs: Option<u64>,
}

impl RawApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Build from a vendor's message list. The first coded line becomes the
    /// primary code and message; without one, the first line is used.
    pub fn from_messages(messages: Vec<VendorMessage>) -> Self {
        let primary = messages
            .iter()
            .find(|m| m.code.is_some())
            .or_else(|| messages.first())
            .cloned();
        let (code, message) = primary.map_or((None, String::new()), |m| (m.code, m.text));
        Self {
            code,
            message,
            messages,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    #[must_use]
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

impl std::fmt::Display for RawApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Maps a vendor's raw error to a [`ClassifiedError`].
///
/// Each adapter implements this; [`RuleClassifier`](crate::RuleClassifier)
/// covers the common table-driven case.
pub trait ErrorClassifier {
    /// Adapter identifier.
    fn provider_name(&self) -> &str;

    fn classify(&self, raw: RawApiError) -> ClassifiedError;

    /// Fallback for unrecognized errors: permanent, vendor text kept.
    fn unknown_error(&self, raw: RawApiError) -> ClassifiedError {
        let mut err = ClassifiedError::permanent(self.provider_name(), raw.message)
            .with_details(raw.messages);
        err.code = raw.code;
        err
    }
}

/// Where the session cache reads the current credentials and endpoint from.
pub trait CredentialSource: Send + Sync {
    /// Credentials as configured right now; may change between calls.
    fn credentials(&self) -> Result<Credentials>;

    /// Base URL of the vendor API as configured right now.
    fn endpoint(&self) -> String;
}

/// An adapter's derived session, as seen by the client.
pub trait SessionHandle: Send + Sync {
    /// Throw the session away; the next call derives a new one.
    fn invalidate(&self);

    /// Apply lifetime and refresh settings. A session that is already
    /// derived keeps its expiry.
    fn configure(&self, settings: SessionSettings);
}

/// Resolves geo group metadata for the merge engine.
pub trait GroupResolver {
    fn resolve_group(&self, group_id: &str) -> Result<GroupDetail>;
}

impl<F> GroupResolver for F
where
    F: Fn(&str) -> Result<GroupDetail>,
{
    fn resolve_group(&self, group_id: &str) -> Result<GroupDetail> {
        self(group_id)
    }
}

/// Adapter-side result: vendor errors stay raw until the core classifies
/// them.
pub type RawResult<T> = std::result::Result<T, RawApiError>;

/// A DNS vendor.
///
/// Implementations translate between the vendor's wire protocol and raw
/// entries. Merging, pagination, session caching and retries are done by the
/// core on top of these calls. Every listing returns the one page `page`
/// asks for, holding at most `page.page_size` items.
pub trait VendorAdapter: CredentialSource + ErrorClassifier + Send + Sync {
    /// Adapter identifier.
    fn id(&self) -> &'static str;

    fn metadata(&self) -> ProviderMetadata;

    fn list_zones(&self, page: &PageRequest) -> RawResult<Page<Zone>>;

    /// Create or update a zone; returns it as stored by the vendor.
    fn put_zone(&self, zone: &Zone) -> RawResult<Zone>;

    fn delete_zone(&self, zone_id: &str) -> RawResult<()>;

    /// Raw entries of a zone, sorted for merging, optionally narrowed to a
    /// name and a type code.
    fn list_raw_entries(
        &self,
        zone: &Zone,
        name: Option<&str>,
        type_code: Option<u16>,
        page: &PageRequest,
    ) -> RawResult<Page<RecordEntry>>;

    /// Raw entries belonging to one geo group or weighted pool.
    fn list_group_entries(
        &self,
        zone: &Zone,
        group_id: &str,
        page: &PageRequest,
    ) -> RawResult<Page<RecordEntry>>;

    fn resolve_group_detail(&self, zone: &Zone, group_id: &str) -> RawResult<GroupDetail>;

    /// Create a row; returns it with its vendor id.
    fn create_raw(&self, zone: &Zone, entry: &RecordEntry) -> RawResult<RecordEntry>;

    /// Update a row identified by `entry.id`.
    fn update_raw(&self, zone: &Zone, entry: &RecordEntry) -> RawResult<RecordEntry>;

    fn delete_raw(&self, zone: &Zone, entry_id: &str) -> RawResult<()>;

    /// The adapter's session, if it keeps one, so the client can apply its
    /// session settings and a session-mismatch error can invalidate it
    /// before the retry.
    fn session(&self) -> Option<Arc<dyn SessionHandle>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_messages_prefers_coded_line() {
        let raw = RawApiError::from_messages(vec![
            VendorMessage::info("login: Login successful"),
            VendorMessage::coded("TARGET_EXISTS", "Name already exists"),
        ]);
        assert_eq!(raw.code.as_deref(), Some("TARGET_EXISTS"));
        assert_eq!(raw.message, "Name already exists");
        assert_eq!(raw.messages.len(), 2);
    }

    #[test]
    fn from_messages_without_codes() {
        let raw = RawApiError::from_messages(vec![VendorMessage::info("something odd")]);
        assert_eq!(raw.code, None);
        assert_eq!(raw.message, "something odd");
    }

    #[test]
    fn unknown_error_is_permanent_and_verbatim() {
        struct Vendor;
        impl ErrorClassifier for Vendor {
            fn provider_name(&self) -> &str {
                "vendor"
            }
            fn classify(&self, raw: RawApiError) -> ClassifiedError {
                self.unknown_error(raw)
            }
        }

        let err = Vendor.classify(RawApiError::with_code("E42", "Strange failure"));
        assert_eq!(err.disposition, crate::Disposition::Permanent);
        assert_eq!(err.code.as_deref(), Some("E42"));
        assert_eq!(err.message, "Strange failure");
    }

    #[test]
    fn closures_resolve_groups() {
        let resolver = |id: &str| -> Result<GroupDetail> {
            Ok(GroupDetail {
                name: format!("group-{id}"),
                regions: std::collections::BTreeMap::new(),
            })
        };
        assert_eq!(resolver.resolve_group("7").unwrap().name, "group-7");
    }
}
