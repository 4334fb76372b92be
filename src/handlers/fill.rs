//! Handler for the `fill` command.

use crate::FillArgs;
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use marktrack::engine::chain::{ChainEntry, ExecutionChain};
use marktrack::engine::config::TrackerConfig;
use marktrack::engine::db::{Db, DB_DIR};
use marktrack::engine::error::SubmitError;
use marktrack::engine::repo::{DirectoryRepo, SqliteStore};
use marktrack::engine::resolver::MarkResolver;
use marktrack::engine::session::FillSession;
use marktrack::engine::types::{CompletionRecord, Operator};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Edits requested for one area, applied in chain order.
#[derive(Debug, Default)]
struct AreaEdits {
    skip: bool,
    executors: Vec<i64>,
    quantity: Option<String>,
    date: Option<NaiveDate>,
    remark: Option<String>,
}

impl AreaEdits {
    fn has_values(&self) -> bool {
        !self.executors.is_empty() || self.quantity.is_some() || self.remark.is_some()
    }
}

/// Opens a fill session for a mark, applies the requested edits and submits.
///
/// # Errors
/// Returns error if the mark, user, an area or an employee cannot be found,
/// an edit targets a locked area, or the submission is invalid or rejected.
pub fn handle(args: &FillArgs) -> Result<()> {
    let conn = Db::connect()?;
    let config = TrackerConfig::load(Path::new(DB_DIR))?;
    let default_date = args.date.as_deref().map(parse_date).transpose()?;

    let resolver = if args.strict {
        MarkResolver::strict(&conn)
    } else {
        MarkResolver::new(&conn)
    };
    let mark = resolver.resolve(&args.mark)?.mark;

    let user_id = DirectoryRepo::new(&conn)
        .find_user(&args.user)?
        .ok_or_else(|| anyhow!("Unknown user '{}'", args.user))?;
    let operator = Operator::new(user_id, &args.user);

    let mut store = SqliteStore::new(conn, config.count_multiplicity);
    let mut session = FillSession::open(
        &store,
        &store,
        mark,
        operator,
        config.count_multiplicity,
    )?;

    let edits = collect_edits(args, session.chain(), &DirectoryRepo::new(store.conn()))?;
    apply_edits(session.chain_mut(), edits, default_date)?;

    if args.dry_run {
        return print_chain(session.chain(), args.json);
    }

    match session.submit(&mut store) {
        Ok(records) if records.is_empty() => {
            print_chain(session.chain(), args.json)?;
            if !args.json {
                println!("{} Nothing to record.", "ℹ".cyan());
            }
            Ok(())
        }
        Ok(records) => {
            if args.json {
                return print_json(session.chain(), &records);
            }
            println!(
                "{} Recorded {} completion(s) for [{}]",
                "✓".green(),
                records.len(),
                session.mark().code.yellow()
            );
            print_human(session.chain());
            Ok(())
        }
        Err(SubmitError::Rejected(errors)) => {
            eprintln!("{} Fill rejected:", "✗".red());
            for e in &errors {
                eprintln!("   - {e}");
            }
            bail!("{} problem(s) reported by the store", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn collect_edits(
    args: &FillArgs,
    chain: &ExecutionChain,
    directory: &DirectoryRepo<'_>,
) -> Result<HashMap<usize, AreaEdits>> {
    let mut edits: HashMap<usize, AreaEdits> = HashMap::new();
    let locate = |area: &str| {
        chain
            .find_area(area)
            .ok_or_else(|| anyhow!("Area '{area}' is not enabled for this mark's project"))
    };

    for area in &args.skip {
        edits.entry(locate(area)?).or_default().skip = true;
    }
    for raw in &args.executor {
        let (area, name) = split_assignment(raw)?;
        let id = directory
            .find_employee(name)?
            .ok_or_else(|| anyhow!("Unknown employee '{name}'"))?;
        edits.entry(locate(area)?).or_default().executors.push(id);
    }
    for raw in &args.entry {
        let (area, value) = split_assignment(raw)?;
        let (quantity, date) = parse_entry_value(value)?;
        let edit = edits.entry(locate(area)?).or_default();
        edit.quantity = Some(quantity.to_string());
        edit.date = date;
    }
    for raw in &args.remark {
        let (area, text) = split_assignment(raw)?;
        edits.entry(locate(area)?).or_default().remark = Some(text.to_string());
    }

    for index in 0..chain.len() {
        if edits.get(&index).is_some_and(|e| e.skip && e.has_values()) {
            bail!(
                "Area '{}' is skipped but also given values; drop --skip or the values",
                chain.entry(index)?.area.title
            );
        }
    }
    Ok(edits)
}

/// Applies edits area by area, so each area sees its predecessors' final state.
fn apply_edits(
    chain: &mut ExecutionChain,
    mut edits: HashMap<usize, AreaEdits>,
    default_date: Option<NaiveDate>,
) -> Result<()> {
    for index in 0..chain.len() {
        let Some(edit) = edits.remove(&index) else {
            continue;
        };
        if edit.skip {
            chain.set_empty(index, true)?;
            continue;
        }
        for id in edit.executors {
            chain.add_executor(index, id)?;
        }
        if let Some(quantity) = edit.quantity {
            chain.set_quantity_text(index, &quantity)?;
            chain.set_date(index, edit.date.or(default_date))?;
        }
        if let Some(remark) = edit.remark {
            chain.set_remark(index, Some(&remark))?;
        }
    }
    Ok(())
}

fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    let (area, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected AREA=VALUE, got '{raw}'"))?;
    if area.trim().is_empty() {
        bail!("Missing area in '{raw}'");
    }
    Ok((area.trim(), value.trim()))
}

fn parse_entry_value(value: &str) -> Result<(&str, Option<NaiveDate>)> {
    match value.split_once('@') {
        Some((quantity, date)) => Ok((quantity.trim(), Some(parse_date(date)?))),
        None => Ok((value.trim(), None)),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{text}', expected YYYY-MM-DD"))
}

#[derive(Serialize)]
struct EntryView {
    area: String,
    order: i64,
    remaining: String,
    finished: bool,
    skipped: bool,
    able_to_fill: bool,
    executors_required: bool,
    quantity: Option<String>,
    date: Option<NaiveDate>,
    executors: Vec<i64>,
}

impl From<&ChainEntry> for EntryView {
    fn from(e: &ChainEntry) -> Self {
        Self {
            area: e.area.title.clone(),
            order: e.area.order,
            remaining: e.remaining.to_string(),
            finished: e.is_finished(),
            skipped: e.is_empty,
            able_to_fill: e.is_able_to_fill,
            executors_required: e.executors_required,
            quantity: e.quantity.map(|q| q.to_string()),
            date: e.date,
            executors: e.executors.iter().copied().collect(),
        }
    }
}

fn print_chain(chain: &ExecutionChain, json: bool) -> Result<()> {
    if json {
        return print_json(chain, &[]);
    }
    print_human(chain);
    Ok(())
}

fn print_json(chain: &ExecutionChain, records: &[CompletionRecord]) -> Result<()> {
    let entries: Vec<EntryView> = chain.entries().iter().map(EntryView::from).collect();
    let output = serde_json::json!({
        "entries": entries,
        "submitted": records,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_human(chain: &ExecutionChain) {
    if chain.is_empty() {
        println!("   (No areas enabled for this project)");
        return;
    }
    for entry in chain.entries() {
        let (icon, state) = entry_state(entry);
        let mut line = format!(
            "   {} {:<12} {:<8} remaining {}",
            icon,
            entry.area.title,
            state,
            entry.remaining
        );
        if let Some(q) = entry.quantity {
            line.push_str(&format!("  +{q}"));
        }
        if let Some(d) = entry.date {
            line.push_str(&format!(" @ {d}"));
        }
        if !entry.executors.is_empty() {
            line.push_str(&format!("  executors: {}", entry.executors.len()));
        }
        println!("{line}");
    }
}

fn entry_state(entry: &ChainEntry) -> (colored::ColoredString, &'static str) {
    if entry.is_finished() {
        ("✓".green(), "done")
    } else if entry.is_empty {
        ("○".dimmed(), "skipped")
    } else if entry.is_able_to_fill {
        ("→".yellow(), "open")
    } else {
        ("✗".red(), "locked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marktrack::engine::types::{AreaSetting, ProductionMark, WorkArea};
    use rust_decimal::Decimal;

    fn chain() -> ExecutionChain {
        let settings: Vec<AreaSetting> = ["КМД", "ЛСБ"]
            .iter()
            .zip(1..)
            .map(|(title, n)| AreaSetting {
                area: WorkArea {
                    id: n,
                    title: (*title).to_string(),
                    order: n,
                    remark: None,
                },
                executors_required: true,
            })
            .collect();
        let mark = ProductionMark {
            id: 1,
            project_id: 1,
            code: "B-1".to_string(),
            title: "Main beam".to_string(),
            order: 1,
            weight: Decimal::new(125, 1),
            count: Decimal::TEN,
            remark: None,
        };
        ExecutionChain::build(&settings, &mark, &HashMap::new(), Decimal::new(5, 1)).unwrap()
    }

    fn args() -> FillArgs {
        FillArgs {
            mark: "B-1".to_string(),
            user: "master".to_string(),
            date: None,
            entry: Vec::new(),
            executor: Vec::new(),
            remark: Vec::new(),
            skip: Vec::new(),
            strict: false,
            dry_run: false,
            json: false,
        }
    }

    #[test]
    fn test_skip_with_values_is_refused() {
        let conn = Db::open_in_memory().unwrap();
        let directory = DirectoryRepo::new(&conn);
        directory.add_employee("Иванов").unwrap();
        let chain = chain();

        for (entry, executor, remark) in [
            (vec!["ЛСБ=5@2026-10-01"], vec![], vec![]),
            (vec![], vec!["ЛСБ=Иванов"], vec![]),
            (vec![], vec![], vec!["ЛСБ=rework"]),
        ] {
            let mut args = args();
            args.skip = vec!["лсб".to_string()];
            args.entry = entry.into_iter().map(String::from).collect();
            args.executor = executor.into_iter().map(String::from).collect();
            args.remark = remark.into_iter().map(String::from).collect();
            let err = collect_edits(&args, &chain, &directory).unwrap_err();
            assert!(err.to_string().contains("'ЛСБ' is skipped"), "{err}");
        }
    }

    #[test]
    fn test_skip_alongside_other_areas() {
        let conn = Db::open_in_memory().unwrap();
        let directory = DirectoryRepo::new(&conn);
        let chain = chain();

        let mut args = args();
        args.skip = vec!["ЛСБ".to_string()];
        args.entry = vec!["КМД=5@2026-10-01".to_string()];
        let edits = collect_edits(&args, &chain, &directory).unwrap();
        assert!(edits[&1].skip);
        assert_eq!(edits[&0].quantity.as_deref(), Some("5"));
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment(" КМД = 10 ").unwrap(), ("КМД", "10"));
        assert_eq!(split_assignment("a=b=c").unwrap(), ("a", "b=c"));
        assert!(split_assignment("no-equals").is_err());
        assert!(split_assignment("=5").is_err());
    }

    #[test]
    fn test_parse_entry_value() {
        let (q, d) = parse_entry_value("7,5@2026-10-01").unwrap();
        assert_eq!(q, "7,5");
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 10, 1));
        assert_eq!(parse_entry_value("3").unwrap(), ("3", None));
        assert!(parse_entry_value("3@01.10.2026").is_err());
    }
}
