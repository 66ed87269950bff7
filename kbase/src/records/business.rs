//! Businesses, keyed by company name in `business/companies.json`

use super::{slugify, FieldPatch, KeyedRecord, Record, RecordKind, RecordPatch};
use crate::error::Result;
use crate::store::DocumentPath;
use serde::{Deserialize, Serialize};

/// Collection document for companies
pub const COMPANIES_PATH: &str = "business/companies.json";

/// Per-company markdown documents kept next to the collection
pub const COMPANY_DOCUMENTS: [&str; 3] = ["strategy", "marketing", "financials"];

/// A company the operator runs or advises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// e.g. "idea", "mvp", "revenue"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Monthly revenue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
}

impl Record for Company {
    const KIND: RecordKind = RecordKind::Company;
    type Patch = CompanyPatch;
}

impl KeyedRecord for Company {}

/// Sparse update for a [`Company`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompanyPatch {
    pub industry: FieldPatch<String>,
    pub stage: FieldPatch<String>,
    pub description: FieldPatch<String>,
    pub revenue: FieldPatch<f64>,
}

impl RecordPatch<Company> for CompanyPatch {
    fn apply(&self, company: &mut Company) -> Result<()> {
        self.industry.apply_optional(&mut company.industry);
        self.stage.apply_optional(&mut company.stage);
        self.description.apply_optional(&mut company.description);
        self.revenue.apply_optional(&mut company.revenue);
        Ok(())
    }
}

/// Paths of the strategy, marketing and financials documents for a company,
/// under `business/<company-slug>/`
pub fn company_document_paths(name: &str) -> Result<Vec<DocumentPath>> {
    let dir = DocumentPath::new(format!("business/{}", slugify(name)))?;
    COMPANY_DOCUMENTS
        .iter()
        .map(|doc| dir.join(&format!("{doc}.md")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_document_paths() {
        let paths = company_document_paths("Acme Widgets").unwrap();
        let paths: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "business/acme-widgets/strategy.md",
                "business/acme-widgets/marketing.md",
                "business/acme-widgets/financials.md",
            ]
        );
    }

    #[test]
    fn test_slugless_company_name_is_invalid_path() {
        assert!(company_document_paths("???").is_err());
    }
}
