use asset_lens::config::{Config, QueryConfig};
use asset_lens::db::{InventoryStorage, NewEquipment, NewMaintenanceEntry};
use asset_lens::query::builder::{BuildContext, build};
use asset_lens::query::intent::{AggregateFn, AggregationHint, Classification, IntentKind};
use asset_lens::query::shaper::{CellValue, WidgetData, WidgetKind, shape};
use asset_lens::service::classifier::KeywordClassifier;
use asset_lens::QueryPipeline;
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn item(tag: &str, name: &str, department: &str, value: f64) -> NewEquipment {
    NewEquipment {
        asset_tag: tag.to_string(),
        name: name.to_string(),
        category: "IT Equipment".to_string(),
        purchase_price: value * 1.5,
        current_value: value,
        department: department.to_string(),
        status: "Active".to_string(),
        condition: Some("Good".to_string()),
        ..NewEquipment::default()
    }
}

async fn empty_store() -> InventoryStorage {
    InventoryStorage::connect("sqlite::memory:")
        .await
        .expect("in-memory store")
}

/// {IT, IT, HR}
async fn fixture_store() -> InventoryStorage {
    let storage = empty_store().await;
    storage
        .insert_equipment_many(&[
            item("AST-000001", "Dell Laptop", "IT", 800.0),
            item("AST-000002", "Cisco Switch", "IT", 2500.0),
            item("AST-000003", "Office Printer", "HR", 300.0),
        ])
        .await
        .expect("fixture insert");
    storage
}

fn ctx(today: NaiveDate) -> BuildContext {
    BuildContext::new(today, &QueryConfig::default())
}

#[tokio::test]
async fn filtered_by_department_returns_only_matching_rows() {
    let storage = fixture_store().await;
    let mut c = Classification::new(IntentKind::Filtered, 0.8);
    c.entities.department = Some("IT".to_string());

    let query = build(&c, &ctx(date(2024, 6, 1))).expect("builds");
    assert_eq!(query.placeholder_count(), query.params.len());
    let rows = storage.execute(&query).await.expect("executes");
    assert_eq!(rows.rows.len(), 2);

    let dept = rows.column_index("department").expect("department column");
    assert!(rows.rows.iter().all(|r| r[dept] == CellValue::Text("IT".to_string())));
}

#[tokio::test]
async fn department_and_price_range_are_anded() {
    let storage = fixture_store().await;
    let mut c = Classification::new(IntentKind::Filtered, 0.8);
    c.entities.department = Some("it".to_string());
    c.filters.price_min = Some(1000.0);

    let rows = storage
        .execute(&build(&c, &ctx(date(2024, 6, 1))).expect("builds"))
        .await
        .expect("executes");
    assert_eq!(rows.rows.len(), 1);
    let tag = rows.column_index("asset_tag").expect("asset_tag column");
    assert_eq!(rows.rows[0][tag], CellValue::Text("AST-000002".to_string()));
}

#[tokio::test]
async fn group_by_department_counts_each_group() {
    let storage = fixture_store().await;
    let mut c = Classification::new(IntentKind::GroupBy, 0.9);
    c.group_by = Some("department".to_string());

    let query = build(&c, &ctx(date(2024, 6, 1))).expect("builds");
    let rows = storage.execute(&query).await.expect("executes");
    assert_eq!(rows.columns, vec!["group_name", "count"]);
    assert_eq!(
        rows.rows,
        vec![
            vec![CellValue::Text("IT".into()), CellValue::Integer(2)],
            vec![CellValue::Text("HR".into()), CellValue::Integer(1)],
        ]
    );

    let widget = shape(&query, rows);
    assert_eq!(widget.widget_kind, WidgetKind::Chart);
    assert_eq!(widget.summary_text, "Showing 2 departments with 3 total items");
}

#[tokio::test]
async fn financial_total_over_empty_table_is_zero_scorecard() {
    let storage = empty_store().await;
    let mut c = Classification::new(IntentKind::Financial, 0.85);
    c.aggregation = Some(AggregationHint {
        function: AggregateFn::Sum,
        column: Some("current_value".to_string()),
    });

    let query = build(&c, &ctx(date(2024, 6, 1))).expect("builds");
    let rows = storage.execute(&query).await.expect("executes");
    let widget = shape(&query, rows);
    assert_eq!(widget.widget_kind, WidgetKind::Scorecard);
    assert!(matches!(widget.data, WidgetData::Scorecard { value, .. } if value == 0.0));
    assert_eq!(widget.summary_text, "Total Equipment Value: $0.00");
}

#[tokio::test]
async fn unknown_aggregate_column_is_rejected_before_the_store() {
    let mut c = Classification::new(IntentKind::Aggregate, 0.85);
    c.aggregation = Some(AggregationHint {
        function: AggregateFn::Sum,
        column: Some("warp_factor".to_string()),
    });
    let err = build(&c, &ctx(date(2024, 6, 1))).expect_err("should reject");
    assert!(matches!(err, asset_lens::LensError::UnsupportedIntent(_)));
}

#[tokio::test]
async fn maintenance_window_includes_due_dates_inside_only() {
    let storage = empty_store().await;
    let mut soon = item("AST-000010", "Forklift", "Operations", 9000.0);
    soon.next_maintenance_date = Some(date(2024, 6, 15));
    let mut later = item("AST-000011", "Conveyor", "Operations", 12000.0);
    later.next_maintenance_date = Some(date(2024, 8, 1));
    let mut overdue = item("AST-000012", "Lathe", "Operations", 5000.0);
    overdue.next_maintenance_date = Some(date(2024, 5, 1));
    storage
        .insert_equipment_many(&[soon, later, overdue])
        .await
        .expect("fixture insert");

    let c = Classification::new(IntentKind::Maintenance, 0.9);
    let rows = storage
        .execute(&build(&c, &ctx(date(2024, 6, 1))).expect("builds"))
        .await
        .expect("executes");

    assert_eq!(rows.rows.len(), 1);
    assert_eq!(rows.rows[0][0], CellValue::Text("AST-000010".to_string()));
    let due = rows.column_index("next_maintenance_date").expect("due column");
    assert_eq!(rows.rows[0][due], CellValue::Text("2024-06-15".to_string()));
}

#[tokio::test]
async fn deleting_equipment_cascades_maintenance_log() {
    let storage = fixture_store().await;
    let laptop = storage
        .get_by_asset_tag("AST-000001")
        .await
        .expect("lookup")
        .expect("fixture present");
    storage
        .add_maintenance_entry(&NewMaintenanceEntry {
            equipment_id: laptop.id,
            maintenance_date: date(2024, 3, 2),
            maintenance_type: "Preventive".to_string(),
            description: Some("Battery check".to_string()),
            cost: Some(45.0),
            performed_by: None,
        })
        .await
        .expect("maintenance insert");
    assert_eq!(storage.maintenance_history(laptop.id).await.expect("history").len(), 1);

    let mut c = Classification::new(IntentKind::Delete, 0.9);
    c.entities.asset_tag = Some("AST-000001".to_string());
    let query = build(&c, &ctx(date(2024, 6, 1))).expect("builds");
    let rows = storage.execute(&query).await.expect("executes");
    assert_eq!(rows.rows.len(), 1);

    assert!(storage.get_by_asset_tag("AST-000001").await.expect("lookup").is_none());
    assert!(storage.maintenance_history(laptop.id).await.expect("history").is_empty());
    assert_eq!(storage.equipment_count().await.expect("count"), 2);
}

#[tokio::test]
async fn duplicate_asset_tag_is_rejected() {
    let storage = fixture_store().await;
    let err = storage
        .insert_equipment(&item("AST-000001", "Another Laptop", "IT", 700.0))
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn every_pipeline_run_appends_an_audit_row() {
    let storage = fixture_store().await;
    let pipeline = QueryPipeline::new(KeywordClassifier::new(), storage.clone(), &Config::default());

    let answered = pipeline.run("How many items are there?").await;
    assert!(answered.success);
    let widget = answered.widget.expect("widget");
    assert!(matches!(widget.data, WidgetData::Scorecard { value, .. } if value == 3.0));

    let refused = pipeline.run("sing me a song").await;
    assert!(!refused.success);

    let audit = storage.recent_audit(10).await.expect("audit rows");
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].action, "unknown");
    assert!(!audit[0].success);
    assert_eq!(audit[1].action, "aggregate");
    assert!(audit[1].success);
}

#[tokio::test]
async fn update_through_pipeline_changes_status_and_audits_the_row() {
    let storage = fixture_store().await;
    let pipeline = QueryPipeline::new(KeywordClassifier::new(), storage.clone(), &Config::default());

    let resp = pipeline.run("Mark AST-000003 as retired").await;
    assert_eq!(resp.intent_kind, IntentKind::Update);
    assert!(resp.success, "{}", resp.message);

    let printer = storage
        .get_by_asset_tag("AST-000003")
        .await
        .expect("lookup")
        .expect("still present");
    assert_eq!(printer.status, "Retired");

    let audit = storage.recent_audit(1).await.expect("audit rows");
    assert_eq!(audit[0].equipment_id, Some(printer.id));
}

#[tokio::test]
async fn asking_about_removal_leaves_the_row_in_place() {
    let storage = fixture_store().await;
    let pipeline = QueryPipeline::new(KeywordClassifier::new(), storage.clone(), &Config::default());

    let resp = pipeline.run("Should I remove AST-000001 from the inventory?").await;
    assert_ne!(resp.intent_kind, IntentKind::Delete);

    assert!(storage.get_by_asset_tag("AST-000001").await.expect("lookup").is_some());
    assert_eq!(storage.equipment_count().await.expect("count"), 3);
}

#[tokio::test]
async fn count_question_with_cost_wording_returns_a_count() {
    let storage = fixture_store().await;
    let pipeline = QueryPipeline::new(KeywordClassifier::new(), storage, &Config::default());

    let resp = pipeline.run("How many items cost over $500?").await;
    assert_eq!(resp.intent_kind, IntentKind::Aggregate);
    let widget = resp.widget.expect("widget");
    assert!(matches!(widget.data, WidgetData::Scorecard { value, .. } if value == 2.0));
}

#[tokio::test]
async fn average_by_department_runs_an_average() {
    let storage = fixture_store().await;
    let pipeline = QueryPipeline::new(KeywordClassifier::new(), storage, &Config::default());

    let resp = pipeline.run("What is the average purchase price by department?").await;
    assert_eq!(resp.intent_kind, IntentKind::GroupBy);
    let widget = resp.widget.expect("widget");
    assert_eq!(widget.title, "Average Purchase Price by Department");
    let WidgetData::Chart { measure, points, .. } = widget.data else {
        panic!("expected chart");
    };
    assert_eq!(measure, "avg_price");
    // IT: (1200 + 3750) / 2, HR: 450
    assert_eq!(points[0].label, "IT");
    assert_eq!(points[0].value, 2475.0);
    assert_eq!(points[1].value, 450.0);
}
