//! CSV rendering of simulation results

use opencor_sed::InstanceTask;
use opencor_shared::number::format_double;

struct Column<'a> {
    header: String,
    values: &'a [f64],
}

fn header(name: &str, unit: &str) -> String {
    let header = if unit.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({unit})")
    };

    escape(&header)
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn columns(task: &InstanceTask) -> Vec<Column<'_>> {
    let mut columns = vec![Column {
        header: header(&task.voi_name(), task.voi_unit()),
        values: task.voi(),
    }];

    columns.extend((0..task.state_count()).map(|index| Column {
        header: header(&task.state_name(index), task.state_unit(index)),
        values: task.state(index),
    }));
    columns.extend((0..task.rate_count()).map(|index| Column {
        header: header(&task.rate_name(index), &task.rate_unit(index)),
        values: task.rate(index),
    }));
    columns.extend((0..task.constant_count()).map(|index| Column {
        header: header(&task.constant_name(index), task.constant_unit(index)),
        values: task.constant(index),
    }));
    columns.extend((0..task.computed_constant_count()).map(|index| Column {
        header: header(&task.computed_constant_name(index), task.computed_constant_unit(index)),
        values: task.computed_constant(index),
    }));
    columns.extend((0..task.algebraic_count()).map(|index| Column {
        header: header(&task.algebraic_name(index), task.algebraic_unit(index)),
        values: task.algebraic(index),
    }));

    // models without a variable of integration have no voi column
    columns.retain(|column| !column.header.is_empty());

    columns
}

/// Renders the results of a task, one column per variable and one row per
/// output point.
///
/// Values are written in the number format of CellML and SED-ML documents.
pub fn render(task: &InstanceTask) -> String {
    let columns = columns(task);
    let row_count = columns.iter().map(|column| column.values.len()).max().unwrap_or_default();

    let mut lines = Vec::with_capacity(row_count + 1);

    lines.push(columns.iter().map(|column| column.header.as_str()).collect::<Vec<_>>().join(","));

    for row in 0..row_count {
        let line = columns
            .iter()
            .map(|column| column.values.get(row).map(|value| format_double(*value)).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");

        lines.push(line);
    }

    let mut csv = lines.join("\n");

    csv.push('\n');

    csv
}

#[cfg(test)]
mod tests {
    use std::fs;

    use opencor_model::EvaluationMode;
    use opencor_sed::Instance;

    use super::*;
    use crate::test::{DECAY_MODEL, engine};

    fn decay_instance() -> Instance {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("decay.cellml");

        fs::write(&path, DECAY_MODEL).unwrap();

        let engine = engine();
        let file = engine.open(&path.to_string_lossy());
        let document = engine.document(&file);
        let mut instance = engine.instantiate(&document, EvaluationMode::Interpreted);

        instance.run();

        instance
    }

    #[test]
    fn headers_name_variables_and_units() {
        let instance = decay_instance();
        let csv = instance.task(0).map(render).unwrap_or_default();

        assert_eq!(
            csv.lines().next(),
            Some(
                "environment/time (second),main/x (millimolar),main/x' (millimolar/second),\
                 main/k (per_second),main/half_life (second),main/y (millimolar)"
            )
        );
    }

    #[test]
    fn one_row_per_output_point() {
        let instance = decay_instance();
        let csv = instance.task(0).map(render).unwrap_or_default();
        let mut rows = csv.lines().skip(1);

        assert_eq!(csv.lines().count(), 1002);

        let first = rows.next().unwrap_or_default();

        assert!(first.starts_with("0,2,-1,0.5,"), "unexpected first row: {first}");
        assert!(first.ends_with(",4"), "unexpected first row: {first}");
        assert!(rows.all(|row| row.split(',').count() == 6));
    }

    #[test]
    fn awkward_headers_are_quoted() {
        assert_eq!(header("a,b", ""), "\"a,b\"");
        assert_eq!(header("say \"hi\"", "s"), "\"say \"\"hi\"\" (s)\"");
        assert_eq!(header("main/x", "mM"), "main/x (mM)");
    }
}
