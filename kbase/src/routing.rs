//! Topic routing for context loading
//!
//! A free-text query is mapped to topics through a fixed table of trigger
//! keywords (case-insensitive literal substrings). Each topic names the
//! documents it loads. Nothing here tries to understand the query.

use crate::error::Result;
use crate::records::{business, career, goals, ideas, skills};
use crate::store::{DocumentPath, DocumentStore};
use serde::Serialize;
use std::fmt;

/// Knowledge-base areas a query can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Career,
    Skills,
    Projects,
    Goals,
    Journal,
    Business,
    Ideas,
}

impl Topic {
    /// Every topic, in routing order
    pub const ALL: [Topic; 7] = [
        Topic::Career,
        Topic::Skills,
        Topic::Projects,
        Topic::Goals,
        Topic::Journal,
        Topic::Business,
        Topic::Ideas,
    ];

    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Topic::Career => "career",
            Topic::Skills => "skills",
            Topic::Projects => "projects",
            Topic::Goals => "goals",
            Topic::Journal => "journal",
            Topic::Business => "business",
            Topic::Ideas => "ideas",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the routing table
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub topic: Topic,
    /// Lowercase trigger substrings
    pub keywords: &'static [&'static str],
    /// Documents loaded when the topic matches
    pub documents: Vec<&'static str>,
}

/// A document loaded for a routed query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextDocument {
    pub topic: Topic,
    pub path: String,
    pub content: String,
}

/// Keyword table from queries to topics
#[derive(Debug, Clone)]
pub struct TopicRouter {
    routes: Vec<Route>,
}

impl Default for TopicRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRouter {
    /// The built-in routing table
    pub fn new() -> Self {
        let routes = vec![
            Route {
                topic: Topic::Career,
                keywords: &[
                    "career", "job", "interview", "application", "resume", "salary", "hiring",
                    "offer", "role",
                ],
                documents: vec![career::APPLICATIONS_PATH, career::INTERVIEWS_PATH],
            },
            Route {
                topic: Topic::Skills,
                keywords: &["skill", "learn", "experience", "expert", "tech stack"],
                documents: vec![skills::SKILLS_PATH],
            },
            Route {
                topic: Topic::Projects,
                keywords: &["project", "build", "side project", "portfolio", "shipped"],
                documents: vec![
                    "projects/active.json",
                    "projects/planned.json",
                    "projects/completed.json",
                ],
            },
            Route {
                topic: Topic::Goals,
                keywords: &["goal", "plan", "objective", "target", "resolution"],
                documents: vec![goals::GOALS_PATH],
            },
            Route {
                topic: Topic::Journal,
                keywords: &["journal", "feel", "mood", "today", "yesterday", "week", "story"],
                documents: Vec::new(),
            },
            Route {
                topic: Topic::Business,
                keywords: &["business", "company", "startup", "revenue", "customer", "marketing"],
                documents: vec![business::COMPANIES_PATH],
            },
            Route {
                topic: Topic::Ideas,
                keywords: &["idea", "brainstorm", "concept"],
                documents: vec![ideas::IDEAS_PATH],
            },
        ];
        Self { routes }
    }

    /// The routing table
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Topics whose keywords occur in `query`, in table order
    pub fn route(&self, query: &str) -> Vec<Topic> {
        let query = query.to_lowercase();
        self.routes
            .iter()
            .filter(|route| route.keywords.iter().any(|k| query.contains(k)))
            .map(|route| route.topic)
            .collect()
    }

    /// Documents for a topic
    pub fn documents(&self, topic: Topic) -> Vec<DocumentPath> {
        self.routes
            .iter()
            .filter(|route| route.topic == topic)
            .flat_map(|route| route.documents.iter())
            .filter_map(|path| DocumentPath::new(*path).ok())
            .collect()
    }

    /// Read every document the query routes to, skipping missing ones
    pub async fn load_context(
        &self,
        store: &dyn DocumentStore,
        query: &str,
    ) -> Result<Vec<ContextDocument>> {
        let topics = self.route(query);
        tracing::debug!("Query routed to topics {:?}", topics);

        let mut loaded = Vec::new();
        for topic in topics {
            for path in self.documents(topic) {
                match store.read_to_string(&path).await {
                    Ok(content) => loaded.push(ContextDocument {
                        topic,
                        path: path.to_string(),
                        content,
                    }),
                    Err(e) if e.is_not_found() => {
                        tracing::debug!("Context document {} does not exist", path);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ProjectStatus;
    use crate::store::{LocalBackend, Precondition};
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_every_topic_has_exactly_one_route() {
        let router = TopicRouter::new();
        for topic in Topic::ALL {
            let count = router.routes().iter().filter(|r| r.topic == topic).count();
            assert_eq!(count, 1, "topic {topic} should have one route");
        }
    }

    #[test]
    fn test_keywords_are_lowercase_and_documents_valid() {
        let router = TopicRouter::new();
        for route in router.routes() {
            assert!(!route.keywords.is_empty());
            for keyword in route.keywords {
                assert_eq!(*keyword, keyword.to_lowercase());
            }
            for doc in &route.documents {
                assert!(DocumentPath::new(*doc).is_ok(), "bad path {doc}");
            }
        }
    }

    #[test]
    fn test_project_routes_cover_every_status() {
        let router = TopicRouter::new();
        let docs: HashSet<String> = router
            .documents(Topic::Projects)
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        for status in ProjectStatus::ALL {
            assert!(docs.contains(status.collection_path().as_str()));
        }
    }

    #[test]
    fn test_route_is_case_insensitive_substring() {
        let router = TopicRouter::new();
        assert_eq!(router.route("Prep for my INTERVIEW"), vec![Topic::Career]);
        assert_eq!(
            router.route("which skills did my projects use"),
            vec![Topic::Skills, Topic::Projects]
        );
        assert!(router.route("hello there").is_empty());
    }

    #[tokio::test]
    async fn test_load_context_skips_missing_documents() {
        let temp = TempDir::new().unwrap();
        let store = LocalBackend::new(temp.path());
        let skills = DocumentPath::new(skills::SKILLS_PATH).unwrap();
        store
            .write(&skills, b"{}\n", &Precondition::Any, "seed")
            .await
            .unwrap();

        let router = TopicRouter::new();
        let docs = router.load_context(&store, "skills and goals").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].topic, Topic::Skills);
        assert_eq!(docs[0].content, "{}\n");
    }
}
