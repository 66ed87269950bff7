//! Business tools
//!
//! A company lives in the `business/companies.json` collection and gets a
//! directory of markdown documents (strategy, marketing, financials) created
//! alongside it. The directory is named by the slug of the company name, so
//! two names with the same slug cannot both be added.

use super::{Arguments, BaseToolImpl, KbTool, ToolContext, ToolRegistry};
use crate::codec::{FrontmatterDocument, Metadata};
use crate::error::{KbError, Result};
use crate::records::business::{company_document_paths, COMPANY_DOCUMENTS};
use crate::records::{slugify, Company, CompanyPatch, RecordKind};
use crate::store::{DocumentPath, Precondition};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::Serialize;
use serde_json::{json, Value};

/// Register business tools with the registry
pub fn register_business_tools(registry: &mut ToolRegistry) {
    registry.register(AddCompanyTool);
    registry.register(UpdateCompanyTool);
}

#[derive(Debug, Serialize)]
struct AddedCompany {
    name: String,
    #[serde(flatten)]
    company: Company,
    documents: Vec<String>,
}

/// Write a company document unless one is already there
async fn seed_document(
    context: &ToolContext,
    path: &DocumentPath,
    company: &str,
    kind: &str,
    body: Option<String>,
) -> Result<bool> {
    let store = context.store();
    if store.exists(path).await? {
        tracing::debug!("Keeping existing company document {}", path);
        return Ok(false);
    }

    let mut metadata = Metadata::new();
    metadata.insert("company", company);
    metadata.insert("document", kind);
    let body = body.unwrap_or_else(|| format!("# {company} {kind}\n"));
    let text = FrontmatterDocument::new(metadata, body).serialize()?;

    let message = format!("Add {kind} document for {company}");
    match store
        .write(path, text.as_bytes(), &Precondition::Absent, &message)
        .await
    {
        Ok(_) => Ok(true),
        Err(e) if e.is_conflict() => {
            tracing::warn!("Company document {} appeared concurrently, keeping it", path);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Add a company and its documents
pub struct AddCompanyTool;

#[async_trait]
impl KbTool for AddCompanyTool {
    fn name(&self) -> &'static str {
        "add_company"
    }

    fn description(&self) -> &'static str {
        "Add a company and create its strategy, marketing and financials documents. Document bodies may be given; existing documents are kept."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "industry": {"type": "string"},
                "stage": {"type": "string"},
                "description": {"type": "string"},
                "revenue": {"type": "number"},
                "strategy": {"type": "string"},
                "marketing": {"type": "string"},
                "financials": {"type": "string"}
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let name = BaseToolImpl::take_string(&mut arguments, "name")?;
        let name = name.trim().to_string();
        let mut bodies = Vec::with_capacity(COMPANY_DOCUMENTS.len());
        for kind in COMPANY_DOCUMENTS {
            bodies.push(BaseToolImpl::take_optional_string(&mut arguments, kind)?);
        }
        let company: Company = BaseToolImpl::parse_arguments(arguments)?;

        let paths = company_document_paths(&name)?;
        let collection = RecordKind::Company.document_path()?;
        let slug = slugify(&name);
        let companies = context.engine.load_map::<Company>(&collection).await?;
        if let Some(existing) = companies
            .keys()
            .find(|key| **key != name && slugify(key) == slug)
        {
            return Err(KbError::duplicate(
                RecordKind::Company.name(),
                format!("{name} (business/{slug}/ belongs to '{existing}')"),
            ));
        }
        context
            .engine
            .add_keyed(&collection, &name, company.clone())
            .await?;

        let mut documents = Vec::new();
        for ((path, kind), body) in paths.iter().zip(COMPANY_DOCUMENTS).zip(bodies) {
            seed_document(context, path, &name, kind, body).await?;
            documents.push(path.to_string());
        }

        BaseToolImpl::json_response(&AddedCompany {
            name,
            company,
            documents,
        })
    }
}

/// Patch a company
pub struct UpdateCompanyTool;

#[async_trait]
impl KbTool for UpdateCompanyTool {
    fn name(&self) -> &'static str {
        "update_company"
    }

    fn description(&self) -> &'static str {
        "Update fields of a company. Omitted fields are unchanged; null clears a field."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "industry": {"type": ["string", "null"]},
                "stage": {"type": ["string", "null"]},
                "description": {"type": ["string", "null"]},
                "revenue": {"type": ["number", "null"]}
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let name = BaseToolImpl::take_string(&mut arguments, "name")?;
        let patch: CompanyPatch = BaseToolImpl::parse_arguments(arguments)?;
        let collection = RecordKind::Company.document_path()?;

        let company = context
            .engine
            .patch_keyed::<Company>(&collection, name.trim(), &patch)
            .await?;
        BaseToolImpl::json_response(&company)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::DocumentPath;
    use crate::tools::test_support::*;
    use crate::tools::{result_text, ToolRegistry};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_add_company_creates_documents() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();

        let added: Value = serde_json::from_str(
            &call_ok(
                &registry,
                &context,
                "add_company",
                json!({"name": "Acme Widgets", "industry": "hardware", "strategy": "Sell widgets."}),
            )
            .await,
        )
        .unwrap();
        assert_eq!(added["industry"], "hardware");
        assert_eq!(added["documents"].as_array().unwrap().len(), 3);

        let strategy = DocumentPath::new("business/acme-widgets/strategy.md").unwrap();
        let text = context.store().read_to_string(&strategy).await.unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.contains("company: Acme Widgets"));
        assert!(text.ends_with("Sell widgets."));

        let marketing = DocumentPath::new("business/acme-widgets/marketing.md").unwrap();
        let text = context.store().read_to_string(&marketing).await.unwrap();
        assert!(text.contains("# Acme Widgets marketing"));
    }

    #[tokio::test]
    async fn test_company_names_sharing_a_slug_are_duplicates() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();

        call_ok(&registry, &context, "add_company", json!({"name": "Acme Inc", "strategy": "A plan"})).await;
        let result = call(
            &registry,
            &context,
            "add_company",
            json!({"name": "acme-inc", "strategy": "B plan"}),
        )
        .await;
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).unwrap().contains("Acme Inc"));

        let strategy = DocumentPath::new("business/acme-inc/strategy.md").unwrap();
        let text = context.store().read_to_string(&strategy).await.unwrap();
        assert!(text.ends_with("A plan"));

        let companies = context
            .store()
            .read_to_string(&DocumentPath::new("business/companies.json").unwrap())
            .await
            .unwrap();
        assert!(!companies.contains("acme-inc"));
    }

    #[tokio::test]
    async fn test_update_company() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();

        call_ok(&registry, &context, "add_company", json!({"name": "Acme", "stage": "idea"})).await;
        let updated: Value = serde_json::from_str(
            &call_ok(
                &registry,
                &context,
                "update_company",
                json!({"name": "Acme", "stage": "mvp", "revenue": 1200.5}),
            )
            .await,
        )
        .unwrap();
        assert_eq!(updated, json!({"stage": "mvp", "revenue": 1200.5}));

        let result = call(&registry, &context, "update_company", json!({"name": "Nope"})).await;
        assert_eq!(result.is_error, Some(true));
    }
}
