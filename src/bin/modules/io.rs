use super::app::LimitTable;
use super::cli::{OutputFormat, Quantity};
use super::error::CliError;
use prettytable::*;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

pub fn get_writer(output_path: &Option<PathBuf>) -> Result<Box<dyn Write>, CliError> {
    match output_path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| CliError::Io {
                path: path.clone(),
                source: e,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

pub fn write_table(
    mut writer: Box<dyn Write>,
    table: &LimitTable,
    format: &OutputFormat,
    precision: usize,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Pretty => write_pretty_table(&mut writer, table, precision),
        OutputFormat::Csv => write_csv(&mut writer, table, precision),
        OutputFormat::Json => write_json(&mut writer, table, precision),
    }?;
    writer.flush()?;
    Ok(())
}

fn quantity_label(quantity: Quantity) -> &'static str {
    match quantity {
        Quantity::CrossSection => "cross section (cm²)",
        Quantity::Axion => "axion coupling (MeV)",
        Quantity::FifthForce => "fifth-force strength",
    }
}

/// The smallest finite value of the table, with its column and mass.
fn best_limit(table: &LimitTable) -> Option<(&str, f64, f64)> {
    table
        .columns
        .iter()
        .flat_map(|column| {
            column
                .values
                .iter()
                .zip(table.masses.iter())
                .map(move |(&value, &mass)| (column.name.as_str(), mass, value))
        })
        .filter(|(_, _, value)| value.is_finite())
        .min_by(|a, b| a.2.total_cmp(&b.2))
}

fn write_pretty_table(
    writer: &mut dyn Write,
    table: &LimitTable,
    precision: usize,
) -> Result<(), CliError> {
    let box_format = format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Title],
            format::LineSeparator::new('═', '╪', '╞', '╡'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build();

    let summary_format = format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build();

    let mut title_table = Table::new();
    title_table.set_format(box_format);
    title_table.add_row(row![bc->format!("{} Dark-Matter Limits", table.experiment)]);
    title_table.print(writer)?;
    writeln!(writer)?;

    let mut summary_table = Table::new();
    summary_table.set_format(summary_format);
    summary_table.add_row(row![b->"Mediator:", table.mediator]);
    summary_table.add_row(row![b->"Channel:", table.channel]);
    summary_table.add_row(row![b->"Quantity:", quantity_label(table.quantity)]);
    summary_table.add_row(row![b->"Masses:", table.masses.len()]);
    if let Some((column, mass, value)) = best_limit(table) {
        summary_table.add_row(row![
            b->"Best Limit:",
            format!("{:.prec$e} ({}) at m_x = {:.prec$e} MeV", value, column, mass, prec = precision)
        ]);
    }
    summary_table.print(writer)?;
    writeln!(writer)?;

    let mut data_table = Table::new();
    data_table.set_format(box_format);
    let mut titles = Row::new(vec![Cell::new("m_x (MeV)").style_spec("bc")]);
    for column in &table.columns {
        titles.add_cell(Cell::new(&column.name).style_spec("bc"));
    }
    data_table.set_titles(titles);

    for (i, mass) in table.masses.iter().enumerate() {
        let mut row = Row::new(vec![
            Cell::new(&format!("{:.prec$e}", mass, prec = precision)).style_spec("r"),
        ]);
        for column in &table.columns {
            row.add_cell(
                Cell::new(&format!("{:.prec$e}", column.values[i], prec = precision))
                    .style_spec("r"),
            );
        }
        data_table.add_row(row);
    }

    data_table.print(writer)?;

    Ok(())
}

fn write_csv(writer: &mut dyn Write, table: &LimitTable, precision: usize) -> Result<(), CliError> {
    write!(writer, "mx")?;
    for column in &table.columns {
        write!(writer, ",{}", column.name)?;
    }
    writeln!(writer)?;

    for (i, mass) in table.masses.iter().enumerate() {
        write!(writer, "{:.*e}", precision, mass)?;
        for column in &table.columns {
            write!(writer, ",{:.*e}", precision, column.values[i])?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// JSON has no infinity; unbounded limits are written as `null`.
fn json_number(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{:.*e}", precision, value)
    } else {
        "null".to_string()
    }
}

fn write_json(writer: &mut dyn Write, table: &LimitTable, precision: usize) -> Result<(), CliError> {
    writeln!(writer, "{{")?;
    writeln!(writer, "  \"experiment\": \"{}\",", table.experiment)?;
    writeln!(writer, "  \"mediator\": \"{}\",", table.mediator)?;
    writeln!(writer, "  \"channel\": \"{}\",", table.channel)?;
    writeln!(
        writer,
        "  \"quantity\": \"{}\",",
        quantity_label(table.quantity)
    )?;

    let masses: Vec<String> = table
        .masses
        .iter()
        .map(|&mass| json_number(mass, precision))
        .collect();
    writeln!(writer, "  \"mx\": [{}],", masses.join(", "))?;

    writeln!(writer, "  \"columns\": {{")?;
    for (i, column) in table.columns.iter().enumerate() {
        let comma = if i < table.columns.len() - 1 { "," } else { "" };
        let values: Vec<String> = column
            .values
            .iter()
            .map(|&value| json_number(value, precision))
            .collect();
        writeln!(
            writer,
            "    \"{}\": [{}]{}",
            column.name,
            values.join(", "),
            comma
        )?;
    }
    writeln!(writer, "  }}")?;
    writeln!(writer, "}}")?;
    Ok(())
}
