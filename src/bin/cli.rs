//! csvdb - CLI Client

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use csvdb::executor::QueryResult;
use csvdb::{Config, ExecutionEngine, Outcome};

/// Print welcome banner
fn print_banner(config: &Config) {
    println!(
        r#"
 csvdb - a minimal SQL engine over CSV tables
 Data directory: {}
 Type '.help' for help, '.quit' to exit
"#,
        config.data_dir.display()
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit / .exit      Exit csvdb
  .tables            List all tables
  .schema [table]    Show table schema
  .mode table|json   Choose how results are printed
  .begin             Start a transaction
  .commit            Commit the transaction
  .rollback          Roll back the transaction

SQL Commands:
  CREATE TABLE ...   Create a new table (INT, FLOAT, CHAR columns)
  INSERT INTO ...    Insert one row
  SELECT ...         Query one table or join several
  UPDATE ...         Update rows (literal or column arithmetic)
  DELETE FROM ...    Delete rows

Examples:
  CREATE TABLE users (id INT, name CHAR);
  INSERT INTO users VALUES (1, 'Alice');
  UPDATE users SET id = id + 10 WHERE name = 'Alice';
  SELECT users.name FROM users WHERE id > 5;
"#
    );
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputMode {
    Table,
    Json,
}

/// Format query results as a table
fn format_results(result: &QueryResult) -> String {
    let columns = &result.columns;
    let rows = &result.rows;
    if columns.is_empty() && rows.is_empty() {
        return String::new();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (i, (_, value)) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(value.chars().count());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in rows {
        let row_str: String = row
            .iter()
            .zip(&widths)
            .map(|((_, v), w)| format!(" {:>width$} ", v, width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }

    if !rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned\n", rows.len()));
    output
}

/// Split a buffer into statements on `;` outside quotes
fn split_statements(input: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'') | (None, '"') => {
                quote = Some(c);
                current.push(c);
            }
            (None, ';') => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_string());
                }
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

struct Session {
    engine: ExecutionEngine,
    mode: OutputMode,
}

impl Session {
    /// Run every statement in `sql`, stopping at the first failure.
    /// Earlier statements keep their effects.
    fn execute_batch(&mut self, sql: &str) {
        for stmt in split_statements(sql) {
            let result = self.engine.execute_sql(&stmt);
            let failed = result.is_err();
            self.print(result);
            if failed {
                break;
            }
        }
    }

    fn print(&self, result: csvdb::Result<QueryResult>) {
        match self.mode {
            OutputMode::Json => {
                let outcome = Outcome::from(result);
                match outcome.to_json() {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            OutputMode::Table => match result {
                Ok(result) => {
                    if let Some(msg) = &result.message {
                        println!("{}", msg);
                    } else {
                        print!("{}", format_results(&result));
                    }
                }
                Err(e) => eprintln!("{}", e),
            },
        }
    }

    /// Handle special dot commands. Returns false when the REPL should exit.
    fn handle_special_command(&mut self, cmd: &str) -> bool {
        let parts: Vec<&str> = cmd.split_whitespace().collect();

        match parts.first().copied() {
            Some(".help") => print_help(),
            Some(".quit") | Some(".exit") => return false,
            Some(".tables") => match self.engine.catalog().list_tables() {
                Ok(tables) if tables.is_empty() => println!("No tables found."),
                Ok(tables) => {
                    println!("Tables:");
                    for table in tables {
                        println!("  {}", table);
                    }
                }
                Err(e) => eprintln!("Error: {}", e),
            },
            Some(".schema") => {
                let tables = match parts.get(1) {
                    Some(table) => Ok(vec![table.to_string()]),
                    None => self.engine.catalog().list_tables(),
                };
                match tables {
                    Ok(tables) => {
                        for table in tables {
                            match self.engine.catalog().describe(&table) {
                                Ok(info) => println!("{}", info),
                                Err(e) => eprintln!("Error: {}", e),
                            }
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Some(".mode") => match parts.get(1).copied() {
                Some("table") => self.mode = OutputMode::Table,
                Some("json") => self.mode = OutputMode::Json,
                _ => eprintln!("Usage: .mode table|json"),
            },
            Some(".begin") => match self.engine.begin_transaction() {
                Ok(id) => println!("Transaction {} started", id),
                Err(e) => eprintln!("{}", e),
            },
            Some(".commit") => match self.engine.commit() {
                Ok(id) => println!("Transaction {} committed", id),
                Err(e) => eprintln!("{}", e),
            },
            Some(".rollback") => match self.engine.rollback() {
                Ok(id) => println!("Transaction {} rolled back", id),
                Err(e) => eprintln!("{}", e),
            },
            Some(cmd) => {
                eprintln!("Unknown command: {}", cmd);
                eprintln!("Type '.help' for available commands.");
            }
            None => {}
        }
        true
    }
}

/// Main REPL loop
fn run_repl(config: Config) -> Result<()> {
    let engine = ExecutionEngine::new(config.clone())
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let mut session = Session {
        engine,
        mode: OutputMode::Table,
    };
    let mut editor = DefaultEditor::new().context("initialising line editor")?;

    print_banner(&config);

    let mut input_buffer = String::new();

    loop {
        let prompt = if input_buffer.is_empty() { "csvdb> " } else { "...> " };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("reading input"),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        if input_buffer.is_empty() && trimmed.starts_with('.') {
            if !session.handle_special_command(trimmed) {
                break;
            }
            continue;
        }

        input_buffer.push_str(&line);
        input_buffer.push('\n');

        // Check if statement is complete (ends with semicolon)
        if trimmed.ends_with(';') {
            let sql = std::mem::take(&mut input_buffer);
            session.execute_batch(&sql);
        }
    }

    if session.engine.in_transaction() {
        eprintln!("Warning: uncommitted transaction left open; changes stay on disk");
    }
    println!("Goodbye!");
    Ok(())
}

fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    run_repl(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements() {
        let parts = split_statements("INSERT INTO t VALUES ('a;b'); SELECT * FROM t;");
        assert_eq!(parts, vec!["INSERT INTO t VALUES ('a;b')", "SELECT * FROM t"]);
        assert_eq!(split_statements("  ;  "), Vec::<String>::new());
    }

    #[test]
    fn test_format_results() {
        let result = QueryResult::rows(
            vec!["id".into()],
            vec![vec![("id".into(), "42".into())]],
        );
        let out = format_results(&result);
        assert!(out.starts_with("+----+\n| id |\n+----+\n| 42 |\n+----+\n"));
        assert!(out.ends_with("1 row(s) returned\n"));
    }
}
