//! Ad-hoc report execution.
//!
//! A [`ValidatedReport`] is compiled to a single parameterized statement.
//! Table and column identifiers come from the static catalog only; every
//! filter value is bound.

use sqlx::{PgPool, Postgres, QueryBuilder};

use domain::models::catalog::{AggregationFunction, FieldType, FilterOperator, ReportField};
use domain::models::report::{FilterMode, FilterValue, ReportRow, ValidatedReport};

use crate::metrics::{record_report_rows, QueryTimer};

/// Repository that runs compiled report queries.
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the report and returns at most `max_rows` rows.
    pub async fn execute(
        &self,
        report: &ValidatedReport<'_>,
        max_rows: i64,
    ) -> Result<Vec<ReportRow>, sqlx::Error> {
        let timer = QueryTimer::new("execute_report");
        let mut query = build_report_query(report, max_rows);
        let result = query
            .build_query_scalar::<serde_json::Value>()
            .fetch_all(&self.pool)
            .await;
        timer.record();

        let rows: Vec<ReportRow> = result?
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        record_report_rows(rows.len());
        Ok(rows)
    }
}

/// Compiles a validated report into
/// `SELECT row_to_json(report_rows) FROM (<inner>) AS report_rows`.
pub fn build_report_query(
    report: &ValidatedReport<'_>,
    max_rows: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT row_to_json(report_rows) FROM (SELECT ");

    let mut seen: Vec<String> = Vec::with_capacity(report.columns.len());
    for resolved in &report.columns {
        let key = resolved.column.result_key();
        if seen.contains(&key) {
            continue;
        }
        if !seen.is_empty() {
            qb.push(", ");
        }
        match resolved.column.aggregation {
            Some(agg) => qb.push(aggregate_expr(resolved.field, agg)),
            None => qb.push(select_expr(resolved.field)),
        };
        qb.push(" AS ");
        qb.push(quote_ident(&key));
        seen.push(key);
    }

    qb.push(" FROM ");
    qb.push(quote_ident(report.primary.name));
    for step in &report.joins {
        let r = step.relation;
        qb.push(" LEFT JOIN ");
        qb.push(quote_ident(step.table));
        qb.push(" ON ");
        qb.push(format!(
            "{}.{} = {}.{}",
            quote_ident(r.from_table),
            quote_ident(r.from_column),
            quote_ident(r.to_table),
            quote_ident(r.to_column)
        ));
    }

    if !report.filters.is_empty() {
        let joiner = match report.filter_mode {
            FilterMode::All => " AND ",
            FilterMode::Any => " OR ",
        };
        qb.push(" WHERE ");
        for (i, filter) in report.filters.iter().enumerate() {
            if i > 0 {
                qb.push(joiner);
            }
            qb.push("(");
            qb.push(typed_expr(filter.field));
            qb.push(" ");
            push_comparison(&mut qb, filter.operator, &filter.value);
            qb.push(")");
        }
    }

    if !report.group_by.is_empty() {
        let exprs: Vec<String> = report.group_by.iter().map(|f| select_expr(f)).collect();
        let list = exprs.join(", ");
        qb.push(" GROUP BY ");
        qb.push(&list);
        qb.push(" ORDER BY ");
        qb.push(&list);
    } else if !report.is_aggregate() {
        qb.push(" ORDER BY ");
        qb.push(format!("{}.\"id\"", quote_ident(report.primary.name)));
    }

    qb.push(" LIMIT ");
    qb.push_bind(max_rows);
    qb.push(") AS report_rows");
    qb
}

fn push_comparison(
    qb: &mut QueryBuilder<'static, Postgres>,
    op: FilterOperator,
    value: &FilterValue,
) {
    match op {
        FilterOperator::Contains => {
            qb.push("ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(&value_text(value))));
        }
        FilterOperator::StartsWith => {
            qb.push("ILIKE ");
            qb.push_bind(format!("{}%", escape_like(&value_text(value))));
        }
        _ => {
            qb.push(comparison_sql(op));
            qb.push(" ");
            push_value(qb, value);
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::String(s) => qb.push_bind(s.clone()),
        FilterValue::Number(n) => qb.push_bind(*n),
        FilterValue::Date(d) => qb.push_bind(*d),
    };
}

fn comparison_sql(op: FilterOperator) -> &'static str {
    match op {
        FilterOperator::Equals => "=",
        FilterOperator::NotEquals => "<>",
        FilterOperator::GreaterThan => ">",
        FilterOperator::LessThan => "<",
        FilterOperator::GreaterThanOrEqual => ">=",
        FilterOperator::LessThanOrEqual => "<=",
        FilterOperator::Contains | FilterOperator::StartsWith => "ILIKE",
    }
}

fn value_text(value: &FilterValue) -> String {
    match value {
        FilterValue::String(s) => s.clone(),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Date(d) => d.format(shared::validation::DATE_FORMAT).to_string(),
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_ref(field: &ReportField) -> String {
    format!("{}.{}", quote_ident(field.table), quote_ident(field.column))
}

/// Column cast to its catalog type, used on the left side of filters.
fn typed_expr(field: &ReportField) -> String {
    format!("({})::{}", column_ref(field), field.field_type.sql_cast())
}

/// Plain output column. Date fields are truncated to the calendar day.
fn select_expr(field: &ReportField) -> String {
    match field.field_type {
        FieldType::Date => typed_expr(field),
        FieldType::String | FieldType::Number => column_ref(field),
    }
}

fn aggregate_expr(field: &ReportField, agg: AggregationFunction) -> String {
    match agg {
        AggregationFunction::Count => format!("COUNT({})", column_ref(field)),
        _ => format!("{}({})", agg.sql_function(), typed_expr(field)),
    }
}
