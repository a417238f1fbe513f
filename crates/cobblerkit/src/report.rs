//! Parser for `cobbler <type> report` output.
//!
//! Reports are plain text, one `Label : value` pair per line:
//!
//! ```text
//! Name                           : centos7-x86_64
//! Breed                          : redhat
//! Kernel                         : /var/www/cobbler/ks_mirror/centos7-x86_64/images/pxeboot/vmlinuz
//! ```

use crate::error::{Error, Result};

/// Labeled fields of a single report, in output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    fields: Vec<(String, String)>,
}

impl Report {
    /// Parse report text.
    ///
    /// Lines are split on the first colon and both sides trimmed, so values
    /// may contain colons (URLs, `key=value:...`). Lines without a colon are
    /// ignored.
    pub fn parse(text: &str) -> Self {
        let fields = text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(label, value)| (label.trim().to_string(), value.trim().to_string()))
            .filter(|(label, _)| !label.is_empty())
            .collect();
        Self { fields }
    }

    /// Value of the first field with this exact label.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get), but a missing label is an error naming the object.
    pub fn field(&self, object: &str, label: &str) -> Result<&str> {
        self.get(label).ok_or_else(|| Error::FieldNotFound {
            object: object.to_string(),
            field: label.to_string(),
        })
    }

    /// All fields in output order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Whether no field was parsed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISTRO_REPORT: &str = "\
Name                           : centos7-x86_64
Architecture                   : x86_64
Breed                          : redhat
Comment                        :
Initrd                         : /var/www/cobbler/ks_mirror/centos7-x86_64/images/pxeboot/initrd.img
Kernel                         : /var/www/cobbler/ks_mirror/centos7-x86_64/images/pxeboot/vmlinuz
Kernel Options                 : {}
Kickstart Metadata             : {'tree': 'http://@@http_server@@/cblr/links/centos7-x86_64'}
OS Version                     : rhel7
";

    #[test]
    fn test_parse_distro_report() {
        let report = Report::parse(DISTRO_REPORT);
        assert_eq!(report.get("Breed"), Some("redhat"));
        assert_eq!(report.get("Architecture"), Some("x86_64"));
        assert_eq!(
            report.get("Kernel"),
            Some("/var/www/cobbler/ks_mirror/centos7-x86_64/images/pxeboot/vmlinuz")
        );
    }

    #[test]
    fn test_labels_match_exactly() {
        let report = Report::parse(DISTRO_REPORT);
        // "Kernel" must not pick up "Kernel Options"
        assert_eq!(report.get("Kernel Options"), Some("{}"));
        assert!(report.get("kernel").is_none());
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let report = Report::parse(DISTRO_REPORT);
        assert_eq!(
            report.get("Kickstart Metadata"),
            Some("{'tree': 'http://@@http_server@@/cblr/links/centos7-x86_64'}")
        );
    }

    #[test]
    fn test_empty_value() {
        let report = Report::parse(DISTRO_REPORT);
        assert_eq!(report.get("Comment"), Some(""));
    }

    #[test]
    fn test_missing_field_is_field_not_found() {
        let report = Report::parse(DISTRO_REPORT);
        let err = report.field("centos7-x86_64", "Owners").unwrap_err();
        assert!(matches!(err, Error::FieldNotFound { ref field, .. } if field == "Owners"));
    }

    #[test]
    fn test_lines_without_colon_are_ignored() {
        let report = Report::parse("garbage\n\nBreed : suse\n");
        assert_eq!(report.fields().count(), 1);
        assert_eq!(report.get("Breed"), Some("suse"));
        assert!(Report::parse("").is_empty());
    }
}
