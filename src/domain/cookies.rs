/// Affinity and remember-me cookies the gateway hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieKind {
    Geo,
    RefreshData,
    IdKey,
}

impl CookieKind {
    pub const ALL: [CookieKind; 3] = [CookieKind::Geo, CookieKind::RefreshData, CookieKind::IdKey];

    pub fn name(self) -> &'static str {
        match self {
            CookieKind::Geo => "X-Geo-Sticky",
            CookieKind::RefreshData => "X-Sdk-Refresh-Data",
            CookieKind::IdKey => "X-Sdk-Id-Key",
        }
    }

    /// Storage key for cookies that outlive a checkout.
    pub fn storage_key(self) -> Option<&'static str> {
        match self {
            CookieKind::Geo => None,
            CookieKind::RefreshData => Some("cookie.refresh_data"),
            CookieKind::IdKey => Some("cookie.id_key"),
        }
    }
}

/// Reads a cookie value from a (possibly comma-joined) `Set-Cookie` header.
///
/// The header is cut at `,` and `;`. The cookie is the first segment that
/// starts with `<name>=`, and its value runs to the end of that segment.
pub fn extract_cookie(header: &str, kind: CookieKind) -> Option<String> {
    let name = kind.name();
    header
        .split([',', ';'])
        .filter_map(|segment| segment.trim().strip_prefix(name)?.strip_prefix('='))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    pub geo: Option<String>,
    pub refresh_data: Option<String>,
    pub id_key: Option<String>,
}

impl CookieJar {
    pub fn get(&self, kind: CookieKind) -> Option<&str> {
        match kind {
            CookieKind::Geo => self.geo.as_deref(),
            CookieKind::RefreshData => self.refresh_data.as_deref(),
            CookieKind::IdKey => self.id_key.as_deref(),
        }
    }

    pub fn set(&mut self, kind: CookieKind, value: Option<String>) {
        match kind {
            CookieKind::Geo => self.geo = value,
            CookieKind::RefreshData => self.refresh_data = value,
            CookieKind::IdKey => self.id_key = value,
        }
    }

    /// Records every known cookie present in `header`. Absent ones are kept.
    pub fn absorb(&mut self, header: &str) {
        for kind in CookieKind::ALL {
            if let Some(value) = extract_cookie(header, kind) {
                self.set(kind, Some(value));
            }
        }
    }

    /// Both remember-me cookies are needed to skip the bank app.
    pub fn has_refresh_credentials(&self) -> bool {
        self.refresh_data.is_some() && self.id_key.is_some()
    }

    /// Outbound `Cookie` header, or `None` when the jar is empty.
    pub fn header(&self) -> Option<String> {
        let parts: Vec<String> = CookieKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind).map(|v| format!("{}={}", kind.name(), v)))
            .collect();
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cookie_stops_at_comma_and_attributes() {
        let header = "X-Geo-Sticky=geo-1; Path=/, X-Sdk-Id-Key=id-9, X-Sdk-Refresh-Data=r-7";
        assert_eq!(extract_cookie(header, CookieKind::Geo).as_deref(), Some("geo-1"));
        assert_eq!(extract_cookie(header, CookieKind::IdKey).as_deref(), Some("id-9"));
        assert_eq!(
            extract_cookie(header, CookieKind::RefreshData).as_deref(),
            Some("r-7")
        );
        assert!(extract_cookie("Other=1", CookieKind::Geo).is_none());
    }

    #[test]
    fn test_extract_cookie_needs_exact_name() {
        assert!(extract_cookie("X-Geo-StickyOld=1", CookieKind::Geo).is_none());
        assert!(extract_cookie("Old-X-Geo-Sticky=1", CookieKind::Geo).is_none());
        assert!(extract_cookie("X-Geo-Sticky", CookieKind::Geo).is_none());
        assert_eq!(
            extract_cookie("X-Geo-StickyOld=1, X-Geo-Sticky=g2", CookieKind::Geo).as_deref(),
            Some("g2")
        );
    }

    #[test]
    fn test_absorb_keeps_existing_values() {
        let mut jar = CookieJar::default();
        jar.absorb("X-Sdk-Id-Key=id-1");
        jar.absorb("X-Geo-Sticky=g");
        assert_eq!(jar.id_key.as_deref(), Some("id-1"));
        assert_eq!(jar.geo.as_deref(), Some("g"));
        assert!(!jar.has_refresh_credentials());

        jar.absorb("X-Sdk-Refresh-Data=r");
        assert!(jar.has_refresh_credentials());
    }

    #[test]
    fn test_header() {
        let mut jar = CookieJar::default();
        assert!(jar.header().is_none());
        jar.geo = Some("g".to_string());
        jar.id_key = Some("i".to_string());
        assert_eq!(jar.header().as_deref(), Some("X-Geo-Sticky=g; X-Sdk-Id-Key=i"));
    }
}
