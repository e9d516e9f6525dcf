use super::*;
use std::str::FromStr;
use tempfile::TempDir;

fn product(id: &str, price_cents: u32, currency: &str) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        category: ProductCategory::Apparel,
        platform: Platform::Store,
        price_cents,
        currency: currency.to_string(),
        description: String::new(),
        features: Vec::new(),
        keywords: Vec::new(),
        url: None,
    }
}

#[test]
fn builtin_catalog_loads() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;
    assert_eq!(catalog.len(), 10);
    assert!(!catalog.is_empty());

    let creatine = catalog.get("supp-creatine").expect("known id");
    assert_eq!(creatine.name, "Creatine Monohydrate");
    assert!(catalog.get("does-not-exist").is_none());

    // Every category has at least one product
    for category in ProductCategory::ALL {
        assert!(!catalog.by_category(category).is_empty(), "{category}");
    }
    Ok(())
}

#[test]
fn lookups_by_category_and_platform() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;

    let supplements: Vec<_> = catalog
        .by_category(ProductCategory::Supplement)
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(supplements, vec!["supp-whey-isolate", "supp-creatine"]);

    let app: Vec<_> = catalog
        .by_platform(Platform::App)
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(
        app,
        vec!["prog-strength-8", "app-premium-monthly", "app-premium-annual"]
    );
    Ok(())
}

#[test]
fn search_ranks_keyword_hits_first() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;

    let results = catalog.search("whey protein shake", 3);
    assert_eq!(results[0].id, "supp-whey-isolate");
    assert!(results.iter().any(|p| p.id == "meal-high-protein"));

    assert!(catalog.search("", 5).is_empty());
    assert!(catalog.search("zzzz", 5).is_empty());
    assert_eq!(catalog.search("premium app", 1).len(), 1);
    Ok(())
}

#[test]
fn price_display() {
    assert_eq!(product("a", 5499, "USD").display_price(), "$54.99");
    assert_eq!(product("b", 0, "USD").display_price(), "Free");
    assert_eq!(product("c", 1250, "EUR").display_price(), "12.50 EUR");
    assert_eq!(product("d", 700, "usd").display_price(), "$7.00");
}

#[test]
fn verbosity_levels_extend_each_other() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;
    let whey = catalog.get("supp-whey-isolate").expect("known id");

    let minimal = whey.format(Verbosity::Minimal);
    let standard = whey.format(Verbosity::Standard);
    let detailed = whey.format(Verbosity::Detailed);

    assert_eq!(minimal, "- Whey Protein Isolate | $54.99");
    assert!(standard.starts_with(&minimal));
    assert!(standard.contains("supplement on amazon"));
    assert!(detailed.starts_with(&standard));
    assert!(detailed.contains("Link: https://www.amazon.com/dp/EXAMPLE-WHEY"));
    assert!(detailed.ends_with("ID: supp-whey-isolate"));
    assert!(minimal.len() < standard.len() && standard.len() < detailed.len());
    Ok(())
}

#[test]
fn format_for_ai_skips_unknown_ids() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;

    let text = catalog.format_for_ai(
        &["supp-creatine", "missing", "supp-whey-isolate"],
        Verbosity::Minimal,
    );
    assert_eq!(
        text,
        "- Creatine Monohydrate | $24.99\n- Whey Protein Isolate | $54.99"
    );

    let empty: &[&str] = &[];
    assert_eq!(catalog.format_for_ai(empty, Verbosity::Detailed), "");
    Ok(())
}

#[test]
fn formatted_text_is_cached_per_ids_and_verbosity() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;
    assert_eq!(catalog.cached_formats(), 0);

    let ids = vec!["app-premium-monthly".to_string()];
    let first = catalog.format_for_ai(&ids, Verbosity::Standard);
    let second = catalog.format_for_ai(&ids, Verbosity::Standard);
    assert_eq!(first, second);
    assert_eq!(catalog.cached_formats(), 1);

    catalog.format_for_ai(&ids, Verbosity::Detailed);
    assert_eq!(catalog.cached_formats(), 2);
    Ok(())
}

#[test]
fn invalid_product_lists_are_rejected() {
    let duplicate = ProductCatalog::from_products(
        vec![product("x", 100, "USD"), product("x", 200, "USD")],
        DEFAULT_FORMAT_TTL,
    );
    assert!(matches!(duplicate, Err(FaqError::Catalog(_))));

    let blank = ProductCatalog::from_products(vec![product(" ", 100, "USD")], DEFAULT_FORMAT_TTL);
    assert!(matches!(blank, Err(FaqError::Catalog(_))));
}

#[test]
fn load_reads_json_files_in_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(
        temp_dir.path().join("b.json"),
        r#"[{"id": "hoodie", "name": "Hoodie", "category": "apparel", "platform": "store", "price_cents": 4500}]"#,
    )?;
    std::fs::write(
        temp_dir.path().join("a.json"),
        r#"[{"id": "creatine", "name": "Creatine", "category": "supplement", "platform": "amazon", "price_cents": 1999, "currency": "EUR"}]"#,
    )?;
    std::fs::write(temp_dir.path().join("notes.txt"), "ignored")?;

    let catalog = ProductCatalog::load(temp_dir.path(), Duration::from_secs(60))?;
    let ids: Vec<_> = catalog.products().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["creatine", "hoodie"]);
    assert_eq!(
        catalog.get("hoodie").map(|p| p.currency.as_str()),
        Some("USD")
    );
    assert_eq!(
        catalog.get("creatine").map(Product::display_price),
        Some("19.99 EUR".to_string())
    );
    Ok(())
}

#[test]
fn malformed_catalog_file_is_an_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("broken.json"), "{")?;
    assert!(matches!(
        ProductCatalog::load(temp_dir.path(), Duration::from_secs(60)),
        Err(FaqError::Catalog(_))
    ));
    Ok(())
}

#[test]
fn verbosity_parses_case_insensitively() {
    assert_eq!(
        Verbosity::from_str(" Detailed ").ok(),
        Some(Verbosity::Detailed)
    );
    assert_eq!(Verbosity::from_str("minimal").ok(), Some(Verbosity::Minimal));
    assert!(Verbosity::from_str("loud").is_err());
    assert_eq!(Verbosity::default(), Verbosity::Standard);
}
