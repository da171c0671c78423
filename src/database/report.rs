use tokio_postgres::SimpleQueryMessage;

/// Tabular query result, all cells as text. NULL renders empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl From<Vec<SimpleQueryMessage>> for Report {
    fn from(messages: Vec<SimpleQueryMessage>) -> Self {
        let mut report = Self::default();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if report.columns.is_empty() {
                    report.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                report.rows.push(
                    (0..row.len())
                        .map(|i| row.get(i).unwrap_or_default().to_string())
                        .collect(),
                );
            }
        }
        report
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "(no rows)");
        }
        let widths = self.widths();
        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(widths.iter())
                .map(|(cell, w)| format!(" {:<w$} ", cell, w = *w))
                .collect::<Vec<_>>()
                .join("│")
        };
        let rule = widths
            .iter()
            .map(|w| "─".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("┼");
        writeln!(f, "{}", line(&self.columns))?;
        write!(f, "{}", rule)?;
        for row in self.rows.iter() {
            write!(f, "\n{}", line(row))?;
        }
        Ok(())
    }
}
