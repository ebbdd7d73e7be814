use rdlcore::{
    base::meta::RenderSettings,
    item::CustomItemRegistry,
    render::{CellValue, RenderJob, ReportDefinition},
    utils::error::RdlError,
};
use rdlexpr::{
    Expr, Value, ValueKind,
    aggregate::AggregateFn,
    bigdecimal::BigDecimal,
    context::{CancelToken, ReportContext, Row, Schema},
    expr::BinaryOp,
};

fn schema() -> Schema {
    Schema::new()
        .with_field("Name", ValueKind::String)
        .with_field("Qty", ValueKind::Int32)
}

fn rows(n: i32) -> Vec<Row> {
    (0..n)
        .map(|i| Row::new(i as usize, vec![Value::from(format!("r{}", i)), Value::Int32(i)]))
        .collect()
}

fn hundred_over_qty(schema: &Schema) -> Expr {
    Expr::binary(
        BinaryOp::Div,
        ValueKind::Int32,
        Expr::constant(100),
        schema.field_ref("Qty").unwrap(),
    )
    .unwrap()
}

fn definition() -> ReportDefinition {
    let schema = schema();
    ReportDefinition::new("Sales", schema.clone())
        .with_cell("Name", schema.field_ref("Name").unwrap())
        .with_cell("Ratio", hundred_over_qty(&schema))
        .with_cell("Total", Expr::aggregate("Total", ValueKind::Decimal))
        .with_cell("Broken", Expr::aggregate("Broken", ValueKind::Decimal))
        .with_cell("Region", Expr::parameter("Region", ValueKind::String))
        .with_aggregate("Total", AggregateFn::Sum, schema.field_ref("Qty").unwrap())
        .with_aggregate("Rows", AggregateFn::Count, schema.field_ref("Qty").unwrap())
        .with_aggregate("Broken", AggregateFn::Sum, hundred_over_qty(&schema))
}

fn run(settings: RenderSettings, rpt: &ReportContext, n: i32) -> rdlcore::render::RenderOutput {
    RenderJob::prepare(definition(), &settings)
        .run(rpt, &rows(n), &CustomItemRegistry::new())
        .unwrap()
}

#[test]
fn cells_keep_row_order_across_workers() {
    let settings = RenderSettings {
        worker_threads: 3,
        ..Default::default()
    };
    let rpt = ReportContext::new("Sales").with_parameter("Region", Value::from("North"));
    let output = run(settings, &rpt, 10);

    assert_eq!(output.rows.len(), 10);
    for (i, row) in output.rows.iter().enumerate() {
        assert_eq!(row.position, i);
        assert_eq!(row.cells[0], CellValue::Value(Value::from(format!("r{}", i))));
        assert_eq!(row.cells[4], CellValue::Value(Value::from("North")));
    }
}

#[test]
fn failing_cells_show_the_error_marker() {
    let settings = RenderSettings {
        error_marker: "#Err".to_string(),
        ..Default::default()
    };
    let output = run(settings, &ReportContext::new("Sales"), 3);

    let CellValue::Error { marker, message } = &output.rows[0].cells[1] else {
        panic!("expected an error, got {:?}", output.rows[0].cells[1]);
    };
    assert_eq!(marker, "#Err");
    assert!(!message.is_empty());

    assert_eq!(output.rows[1].cells[1], CellValue::Value(Value::Int32(100)));
    assert_eq!(output.rows[2].cells[1], CellValue::Value(Value::Int32(50)));
}

#[test]
fn aggregates_are_read_ahead() {
    let rpt = ReportContext::new("Sales");
    let output = run(RenderSettings::default(), &rpt, 10);

    // Every row sees the total of the whole dataset.
    for row in &output.rows {
        assert_eq!(row.cells[2], CellValue::Value(Value::Decimal(BigDecimal::from(45))));
    }
    assert_eq!(rpt.aggregate("Rows"), Some(Value::Int32(10)));

    // The failing aggregate is dropped, so its references are unbound.
    assert_eq!(rpt.aggregate("Broken"), None);
    assert!(output.rows.iter().all(|row| row.cells[3].is_error()));
}

#[test]
fn aggregates_do_not_leak_between_runs() {
    let rpt = ReportContext::new("Sales");
    run(RenderSettings::default(), &rpt, 4);
    let output = run(RenderSettings::default(), &rpt, 0);

    assert!(output.rows.is_empty());
    assert_eq!(rpt.aggregate("Total"), Some(Value::Empty));
    assert_eq!(rpt.aggregate("Rows"), Some(Value::Int32(0)));
}

#[test]
fn display_rows_render_markers() {
    let output = run(RenderSettings::default(), &ReportContext::new("Sales"), 2);
    let display = output.display_rows();

    assert_eq!(display[0][0], "r0");
    assert_eq!(display[0][1], "#Error");
    assert_eq!(display[1][1], "100");
    // The parameter was never supplied.
    assert_eq!(display[1][4], "#Error");
}

#[test]
fn cancelled_job_fails() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let rpt = ReportContext::new("Sales").with_cancel_token(cancel);

    let err = RenderJob::prepare(definition(), &RenderSettings::default())
        .run(&rpt, &rows(5), &CustomItemRegistry::new())
        .unwrap_err();
    assert!(matches!(err, RdlError::Cancelled));
}

#[test]
fn prepare_folds_constant_cells() {
    let definition = ReportDefinition::new("Constants", Schema::new()).with_cell(
        "Answer",
        Expr::binary(
            BinaryOp::Mul,
            ValueKind::Int32,
            Expr::constant(6),
            Expr::constant(7),
        )
        .unwrap(),
    );
    let job = RenderJob::prepare(definition, &RenderSettings::default());

    assert_eq!(job.stats().nodes_before, 3);
    assert_eq!(job.stats().nodes_after, 1);
    assert_eq!(job.cell("Answer").unwrap().as_expr(), &Expr::constant(42));
    assert!(job.cell("Missing").is_none());

    // Cells without any field are still evaluated once per row.
    let output = job
        .run(&ReportContext::new("Constants"), &rows(2), &CustomItemRegistry::new())
        .unwrap();
    assert_eq!(output.display_rows(), vec![vec!["42".to_string()], vec!["42".to_string()]]);
}
