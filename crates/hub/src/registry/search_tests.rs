// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::registry::entry::LaunchMethod;
use chrono::Utc;

struct EntryBuilder(RegistryEntry);

impl EntryBuilder {
    fn new(id: &str, name: &str, description: &str) -> Self {
        Self(RegistryEntry {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            source: SourceType::Custom,
            repo_url: None,
            container_image: None,
            categories: Vec::new(),
            tags: Vec::new(),
            official: false,
            featured: false,
            requires_api_key: false,
            launch_method: LaunchMethod::Unknown,
            server_command: None,
            last_refreshed: Utc::now(),
            raw_metadata: std::collections::BTreeMap::new(),
        })
    }

    fn source(mut self, source: SourceType) -> Self {
        self.0.source = source;
        self
    }

    fn official(mut self) -> Self {
        self.0.official = true;
        self
    }

    fn featured(mut self) -> Self {
        self.0.featured = true;
        self
    }

    fn api_key(mut self) -> Self {
        self.0.requires_api_key = true;
        self
    }

    fn categories(mut self, categories: &[&str]) -> Self {
        self.0.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    fn tags(mut self, tags: &[&str]) -> Self {
        self.0.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    fn image(mut self, image: &str) -> Self {
        self.0.container_image = Some(image.to_string());
        self
    }

    fn build(self) -> RegistryEntry {
        self.0
    }
}

fn corpus() -> Vec<RegistryEntry> {
    vec![
        EntryBuilder::new("docker/sqlite", "SQLite", "SQLite database operations")
            .source(SourceType::Docker)
            .categories(&["Database"])
            .tags(&["sql", "database"])
            .image("docker.io/mcp/sqlite")
            .build(),
        EntryBuilder::new("docker/postgres", "PostgreSQL", "Postgres database server")
            .source(SourceType::Docker)
            .categories(&["Database"])
            .tags(&["sql", "postgres"])
            .official()
            .image("docker.io/mcp/postgres")
            .build(),
        EntryBuilder::new("ms/github", "GitHub", "GitHub repository tools")
            .source(SourceType::Mcpservers)
            .categories(&["Development"])
            .tags(&["git", "github"])
            .featured()
            .api_key()
            .build(),
        EntryBuilder::new("aw/weather", "Weather", "Weather forecasts")
            .source(SourceType::Awesome)
            .categories(&["Data"])
            .tags(&["weather"])
            .build(),
    ]
}

mod text_matching {
    use super::*;

    #[test]
    fn exact_name_match_ranks_first() {
        let corpus = corpus();
        let results = search(corpus.iter(), &SearchQuery::text("sqlite"));
        assert!(!results.is_empty());
        assert_eq!(results[0].id, "docker/sqlite");
    }

    #[test]
    fn unrelated_queries_return_nothing() {
        let corpus = corpus();
        let results = search(corpus.iter(), &SearchQuery::text("blockchain oracle"));
        assert!(results.is_empty());
    }

    #[test]
    fn description_words_match() {
        let corpus = corpus();
        let results = search(corpus.iter(), &SearchQuery::text("database"));
        let ids: Vec<&str> = results.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&"docker/sqlite"));
        assert!(ids.contains(&"docker/postgres"));
    }

    #[test]
    fn tag_matches_count() {
        let corpus = corpus();
        let results = search(corpus.iter(), &SearchQuery::text("weather"));
        assert_eq!(results[0].id, "aw/weather");
    }

    #[test]
    fn popularity_breaks_text_ties() {
        // Both database entries match "database"; postgres is official and
        // should outrank plain sqlite when text scores are comparable.
        let corpus = corpus();
        let results = search(corpus.iter(), &SearchQuery::text("database"));
        let sqlite_pos = results.iter().position(|e| e.id == "docker/sqlite");
        let postgres_pos = results.iter().position(|e| e.id == "docker/postgres");
        assert!(postgres_pos.unwrap() < sqlite_pos.unwrap());
    }
}

mod filters {
    use super::*;

    #[test]
    fn source_filter_is_or_logic() {
        let corpus = corpus();
        let query = SearchQuery {
            sources: vec![SourceType::Mcpservers, SourceType::Awesome],
            ..SearchQuery::default()
        };
        let results = search(corpus.iter(), &query);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn category_filter() {
        let corpus = corpus();
        let query = SearchQuery {
            categories: vec!["Database".to_string()],
            ..SearchQuery::default()
        };
        let results = search(corpus.iter(), &query);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn tag_filter() {
        let corpus = corpus();
        let query = SearchQuery {
            tags: vec!["git".to_string()],
            ..SearchQuery::default()
        };
        let results = search(corpus.iter(), &query);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "ms/github");
    }

    #[test]
    fn official_and_featured_filters() {
        let corpus = corpus();
        let official = search(
            corpus.iter(),
            &SearchQuery {
                official_only: true,
                ..SearchQuery::default()
            },
        );
        assert_eq!(official.len(), 1);
        assert_eq!(official[0].id, "docker/postgres");

        let featured = search(
            corpus.iter(),
            &SearchQuery {
                featured_only: true,
                ..SearchQuery::default()
            },
        );
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, "ms/github");
    }

    #[test]
    fn api_key_filter_is_tristate() {
        let corpus = corpus();
        let needs_key = search(
            corpus.iter(),
            &SearchQuery {
                requires_api_key: Some(true),
                ..SearchQuery::default()
            },
        );
        assert_eq!(needs_key.len(), 1);

        let no_filter = search(corpus.iter(), &SearchQuery::default());
        assert_eq!(no_filter.len(), 4);
    }

    #[test]
    fn filters_compose_with_text() {
        let corpus = corpus();
        let query = SearchQuery {
            query: "database".to_string(),
            official_only: true,
            ..SearchQuery::default()
        };
        let results = search(corpus.iter(), &query);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "docker/postgres");
    }
}

mod ranking {
    use super::*;

    #[test]
    fn empty_query_orders_by_popularity() {
        let corpus = corpus();
        let results = search(corpus.iter(), &SearchQuery::default());
        // official + docker + image (30) > featured (12) > docker + image (10) > plain (2)
        assert_eq!(results[0].id, "docker/postgres");
        assert_eq!(results[1].id, "ms/github");
        assert_eq!(results[2].id, "docker/sqlite");
        assert_eq!(results[3].id, "aw/weather");
    }

    #[test]
    fn popularity_table() {
        let official_docker = EntryBuilder::new("a/a", "A", "")
            .source(SourceType::Docker)
            .official()
            .categories(&["x", "y", "z", "w"])
            .image("img/x")
            .build();
        // official 20 + docker 5 + 3 capped categories * 2 + image 3
        assert_eq!(popularity_score(&official_docker), 34.0);

        let official_source = EntryBuilder::new("b/b", "B", "")
            .source(SourceType::McpOfficial)
            .build();
        assert_eq!(popularity_score(&official_source), 15.0);
    }

    #[test]
    fn limit_is_clamped_and_applied() {
        let corpus = corpus();
        let query = SearchQuery {
            limit: 2,
            ..SearchQuery::default()
        };
        assert_eq!(search(corpus.iter(), &query).len(), 2);

        let zero = SearchQuery {
            limit: 0,
            ..SearchQuery::default()
        };
        assert_eq!(search(corpus.iter(), &zero).len(), 1);
    }
}

mod field_scores {
    use super::*;

    #[test]
    fn exact_beats_substring_beats_tokens() {
        let exact = EntryBuilder::new("a/a", "sqlite", "").build();
        let substring = EntryBuilder::new("b/b", "sqlite server", "").build();
        let tokens = EntryBuilder::new("c/c", "server for sqlite things", "").build();

        let exact_score = text_score("sqlite", &exact);
        let substring_score = text_score("sqlite", &substring);
        let token_score = text_score("sqlite", &tokens);

        assert_eq!(exact_score, 100.0);
        assert!(substring_score > 80.0 && substring_score < 100.0);
        assert!(token_score >= 80.0 || token_score >= 60.0);
        assert!(exact_score > substring_score);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let entry = EntryBuilder::new("a/a", "SQLite", "").build();
        assert_eq!(text_score("sqlite", &entry), 100.0);
    }
}
