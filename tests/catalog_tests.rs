//! End-to-end catalog loading
//!
//! Builds catalogs from each on-disk and in-memory layout and checks the
//! resulting histories and lifecycle index.

use std::fs;
use std::path::Path;

use graphql_catalog::{
    Catalog, CatalogConfig, CategoriesConfig, CategoryConfig, ChangeKind, CriticalityLevel, DateOnly,
    DescriptionAugmentation, DiagnosticCode, LoadEnv, Loader, MemoryRevision, MemorySourceConfig, Placement,
    SchemaLifecycle, SchemaSourcesConfig,
};
use tempfile::tempdir;

fn date(s: &str) -> DateOnly {
    s.parse().unwrap()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn load(config: &CatalogConfig) -> graphql_catalog::LoadedCatalog {
    Loader::default().load(config, &LoadEnv::os()).unwrap()
}

fn scenario_config(root: &Path) -> CatalogConfig {
    let mut schema = SchemaSourcesConfig::rooted(root);
    schema.memory = Some(MemorySourceConfig {
        revisions: vec![
            MemoryRevision::new("type Query { hello: String } type User { id: ID! name: String! }")
                .dated(date("2024-01-01"))
                .versioned("v1"),
            MemoryRevision::new(
                "type Query { hello: String world: String } type User { id: ID! name: String! email: String }",
            )
            .dated(date("2024-02-01"))
            .versioned("v2"),
        ],
    });
    CatalogConfig::from_sources(schema)
}

// =============================================================================
// Memory
// =============================================================================

#[test]
fn test_two_version_scenario() {
    let dir = tempdir().unwrap();
    let loaded = load(&scenario_config(dir.path()));
    assert_eq!(loaded.source.as_deref(), Some("memory"));
    let catalog = loaded.data.unwrap();
    assert!(catalog.is_versioned());

    let newest = catalog.schemas()[0].latest_revision().unwrap().clone();
    assert_eq!(newest.date, date("2024-02-01"));
    let paths: Vec<&str> = newest.changes.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["Query.world", "User.email"]);
    assert!(newest
        .changes
        .iter()
        .all(|c| c.kind == ChangeKind::FieldAdded && c.criticality.level == CriticalityLevel::NonBreaking));

    let lifecycle = SchemaLifecycle::from_catalog(&catalog).unwrap();
    assert_eq!(lifecycle.field_added_date("Query", "world"), Some(date("2024-02-01")));
    assert_eq!(lifecycle.field_added_date("User", "id"), Some(date("2024-01-01")));
    assert!(lifecycle.is_field_currently_available("User", "email"));
}

#[test]
fn test_memory_mixed_versions_rejected() {
    let dir = tempdir().unwrap();
    let mut config = scenario_config(dir.path());
    if let Some(memory) = config.schema.memory.as_mut() {
        memory.revisions.push(MemoryRevision::new("type Query { a: String }"));
    }
    assert!(Loader::default().load(&config, &LoadEnv::os()).is_err());
}

// =============================================================================
// File and directories
// =============================================================================

#[test]
fn test_single_file_is_dated_today() {
    let dir = tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: String }");
    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let loaded = load(&config);
    assert_eq!(loaded.source.as_deref(), Some("file"));

    let catalog = loaded.data.unwrap();
    let schema = catalog.schemas()[0];
    assert_eq!(schema.revisions().len(), 1);
    assert_eq!(schema.revisions()[0].date, DateOnly::today());
}

#[test]
fn test_dated_directory_history() {
    let dir = tempdir().unwrap();
    write(dir.path(), "schema/2024-01-01.graphql", "type Query { a: String }");
    write(dir.path(), "schema/2024-02-01.graphql", "type Query { a: String b: Int }");
    write(dir.path(), "schema/2024-03-01.graphql", "type Query { b: Int }");
    write(dir.path(), "schema/README.md", "not a schema");

    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let loaded = load(&config);
    assert_eq!(loaded.source.as_deref(), Some("directory"));

    let catalog = loaded.data.unwrap();
    let schema = catalog.schemas()[0];
    let dates: Vec<String> = schema.revisions().iter().map(|r| r.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-02-01", "2024-01-01"]);

    let newest = &schema.revisions()[0];
    assert_eq!(newest.changes.len(), 1);
    assert_eq!(newest.changes[0].kind, ChangeKind::FieldRemoved);
    assert!(newest.changes[0].is_breaking());
    assert!(schema.definition().get_field("Query", "a").is_none());
}

#[test]
fn test_parse_error_is_fatal() {
    let dir = tempdir().unwrap();
    write(dir.path(), "schema/2024-01-01.graphql", "type Query { a: String }");
    write(dir.path(), "schema/2024-02-01.graphql", "type Query { a: ");
    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let err = Loader::default().load(&config, &LoadEnv::os()).unwrap_err();
    assert!(matches!(err, graphql_catalog::CatalogError::Parse(_)));
}

#[test]
fn test_versioned_directory() {
    let dir = tempdir().unwrap();
    write(dir.path(), "schema/1.0.0/schema.graphql", "type Query { a: String }");
    write(dir.path(), "schema/2.0.0/2024-03-01.graphql", "type Query { a: String b: Int }");
    write(dir.path(), "schema/2.0.0/2024-04-01.graphql", "type Query { a: String b: Int c: Int }");
    write(dir.path(), "schema/10.0.0/schema.graphql", "type Query { a: String b: Int c: Int d: Int }");

    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let loaded = load(&config);
    assert_eq!(loaded.source.as_deref(), Some("versioned-directory"));

    let catalog = loaded.data.unwrap();
    let Catalog::Versioned(versioned) = &catalog else {
        panic!("expected a versioned catalog");
    };
    let versions: Vec<&str> = versioned.versions().into_iter().map(|v| v.encode()).collect();
    assert_eq!(versions, vec!["10.0.0", "2.0.0", "1.0.0"]);

    let v2 = &versioned.entries()[1];
    assert_eq!(v2.parent.as_ref().map(|v| v.encode()), Some("1.0.0"));
    assert_eq!(v2.revisions.len(), 2);
    let first_of_v2 = &v2.revisions[1];
    assert_eq!(first_of_v2.changes.len(), 1);
    assert_eq!(first_of_v2.changes[0].path, "Query.b");

    let lifecycle = SchemaLifecycle::from_catalog(&catalog).unwrap();
    assert_eq!(lifecycle.field_added_date("Query", "c"), Some(date("2024-04-01")));
    assert!(lifecycle.is_field_currently_available("Query", "d"));
}

#[test]
fn test_equivalent_version_folders_rejected() {
    let dir = tempdir().unwrap();
    write(dir.path(), "schema/1.0.0/schema.graphql", "type Query { a: String }");
    write(dir.path(), "schema/v1.0.0/schema.graphql", "type Query { a: String b: Int }");

    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let err = Loader::default().load(&config, &LoadEnv::os()).unwrap_err();
    assert!(matches!(err, graphql_catalog::CatalogError::InvalidConfig(_)));
}

#[test]
fn test_introspection_file_bare_result() {
    let dir = tempdir().unwrap();
    write(dir.path(), "schema.introspection.json", include_str!("fixtures/introspection.json"));
    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let loaded = load(&config);
    assert_eq!(loaded.source.as_deref(), Some("introspection-file"));

    let catalog = loaded.data.unwrap();
    let definition = catalog.latest_definition().unwrap();
    assert_eq!(definition.query_type.as_deref(), Some("Query"));
    assert_eq!(definition.get_field("User", "id").unwrap().ty.to_string(), "ID!");
    assert!(definition.get_type("__Schema").is_none());
}

#[test]
fn test_introspection_file_cache_entry_form() {
    let dir = tempdir().unwrap();
    let result: serde_json::Value = serde_json::from_str(include_str!("fixtures/introspection.json")).unwrap();
    let entry = serde_json::json!({
        "url": "https://api.example.com/graphql",
        "fetchedAt": "2024-06-15T08:30:00Z",
        "introspectionResult": result["data"],
    });
    write(dir.path(), "schema.introspection.json", &entry.to_string());

    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let catalog = load(&config).data.unwrap();
    assert_eq!(catalog.schemas()[0].revisions()[0].date, date("2024-06-15"));
}

#[test]
fn test_invalid_introspection_file_is_fatal() {
    let dir = tempdir().unwrap();
    write(dir.path(), "schema.introspection.json", "{ \"data\": ");
    let config = CatalogConfig::from_sources(SchemaSourcesConfig::rooted(dir.path()));
    let err = Loader::default().load(&config, &LoadEnv::os()).unwrap_err();
    assert!(matches!(err, graphql_catalog::CatalogError::Parse(_)));
}

// =============================================================================
// Augmentation and categories
// =============================================================================

#[test]
fn test_augmentations_and_categories_are_applied() {
    let dir = tempdir().unwrap();
    let mut config = scenario_config(dir.path());
    config.augmentations = vec![
        DescriptionAugmentation::new("User.email", Placement::Over, "Primary address."),
        DescriptionAugmentation::new("User.nickname", Placement::After, "Missing."),
    ];
    config.categories = CategoriesConfig::Uniform(vec![CategoryConfig::include("People", &["/^Us/"])]);

    let loaded = load(&config);
    let catalog = loaded.data.unwrap();
    let latest = catalog.schemas()[0];
    assert_eq!(
        latest.definition().get_field("User", "email").unwrap().description.as_deref(),
        Some("Primary address.")
    );
    assert_eq!(latest.categories()[0].types, vec!["User"]);

    // Revision snapshots keep what was diffed.
    let snapshot = latest.latest_revision().unwrap().snapshot().unwrap();
    assert!(snapshot.get_field("User", "email").unwrap().description.is_none());

    let codes: Vec<DiagnosticCode> = loaded.diagnostics.iter().map(|d| d.code).collect();
    assert!(codes.contains(&DiagnosticCode::AugmentationTargetNotFound));
}

#[test]
fn test_augmentation_scope_without_schema() {
    let dir = tempdir().unwrap();
    let mut config = scenario_config(dir.path());
    let mut aug = DescriptionAugmentation::new("User.email", Placement::Over, "Contact address.");
    aug.versions = Some(vec!["v2".to_string(), "v3".to_string()]);
    config.augmentations = vec![aug];

    let loaded = load(&config);
    let catalog = loaded.data.unwrap();
    let schemas = catalog.schemas();
    assert_eq!(
        schemas[0].definition().get_field("User", "email").unwrap().description.as_deref(),
        Some("Contact address.")
    );

    assert_eq!(loaded.diagnostics.len(), 1);
    let diagnostic = &loaded.diagnostics[0];
    assert_eq!(diagnostic.code, DiagnosticCode::UnmatchedVersionScope);
    assert_eq!(diagnostic.version.as_deref(), Some("v3"));
    assert_eq!(diagnostic.target.as_deref(), Some("User.email"));
}

#[test]
fn test_per_version_categories_without_scope() {
    let dir = tempdir().unwrap();
    let mut config = scenario_config(dir.path());
    config.categories = CategoriesConfig::PerVersion(
        [("v2".to_string(), vec![CategoryConfig::include("Root", &["Query"])])].into_iter().collect(),
    );

    let loaded = load(&config);
    let catalog = loaded.data.unwrap();
    let schemas = catalog.schemas();
    assert_eq!(schemas[0].categories()[0].types, vec!["Query"]);
    assert!(schemas[1].categories().is_empty());
    assert_eq!(loaded.diagnostics.len(), 1);
    assert_eq!(loaded.diagnostics[0].code, DiagnosticCode::UnmatchedVersionScope);
    assert_eq!(loaded.diagnostics[0].version.as_deref(), Some("v1"));
}
