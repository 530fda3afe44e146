// src/import.rs
//! The surface a shell talks to: define templates, list them, run imports.

use rayon::prelude::*;
use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{error, info, instrument};

use crate::error::{NormalizeError, Result};
use crate::locate::{header_fields, BoundarySpec, DataEnd, Delimiter};
use crate::table::{ColumnRole, NormalizedTable, RawTable};
use crate::template::{apply_with_report, RegistrySnapshot, Template, TemplateRegistry};
use crate::transform::{ConversionFlags, TimeDerivation, TimeFormat, TimeRule, DEFAULT_TIME_COLUMN};

/// Everything a shell collects to characterize a new file layout, handed over unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAnswers {
    pub name: String,
    pub boundary: BoundarySpec,
    pub delimiter: Delimiter,
    pub data_end: DataEnd,
    /// A column that already holds total elapsed time.
    pub time_column: Option<String>,
    /// How to compute elapsed time when `time_column` is `None`.
    pub time_derivation: Option<TimeDerivation>,
    pub latitude_columns: Vec<String>,
    pub longitude_columns: Vec<String>,
    pub flags: ConversionFlags,
}

impl TemplateAnswers {
    pub fn new(name: impl Into<String>, boundary: BoundarySpec) -> Self {
        Self {
            name: name.into(),
            boundary,
            delimiter: Delimiter::Detect,
            data_end: DataEnd::Fixed,
            time_column: None,
            time_derivation: None,
            latitude_columns: Vec::new(),
            longitude_columns: Vec::new(),
            flags: ConversionFlags::default(),
        }
    }

    /// Builds the template; with a `sample`, its header is recorded as the signature
    /// and every referenced column must exist in it.
    pub fn into_template(self, sample: Option<&RawTable>) -> Result<Template> {
        if let (Some(col), Some(d)) = (&self.time_column, &self.time_derivation) {
            return Err(NormalizeError::InvalidTemplate(format!(
                "`{}` is given as the time column but a derivation from `{}` is also set",
                col, d.source_column
            )));
        }

        let mut roles: BTreeMap<String, ColumnRole> = BTreeMap::new();
        let tagged = self
            .time_column
            .into_iter()
            .map(|c| (c, ColumnRole::Time))
            .chain(self.latitude_columns.into_iter().map(|c| (c, ColumnRole::Latitude)))
            .chain(self.longitude_columns.into_iter().map(|c| (c, ColumnRole::Longitude)));
        for (col, role) in tagged {
            match roles.get(&col) {
                Some(existing) if *existing != role => {
                    return Err(NormalizeError::InvalidTemplate(format!(
                        "column `{}` is tagged both {} and {}",
                        col,
                        existing.as_str(),
                        role.as_str()
                    )));
                }
                _ => {
                    roles.insert(col, role);
                }
            }
        }

        let mut template = Template::new(self.name, self.boundary)
            .with_delimiter(self.delimiter)
            .with_data_end(self.data_end)
            .with_flags(self.flags);
        template.column_roles = roles;
        if let Some(d) = self.time_derivation {
            template = template.with_time_derivation(d);
        }

        if let Some(raw) = sample {
            template = template.with_signature_from(raw)?;
            let fields = template.header_signature.as_deref().unwrap_or_default();
            let referenced = template
                .column_roles
                .keys()
                .chain(template.time_derivation.iter().map(|d| &d.source_column));
            for col in referenced {
                if !fields.contains(col) {
                    return Err(NormalizeError::UnknownColumn(col.clone()));
                }
            }
        }
        Ok(template)
    }
}

/// Stores a template built from collected answers.
pub fn define_template(
    registry: &TemplateRegistry,
    answers: TemplateAnswers,
    sample: Option<&RawTable>,
) -> Result<Arc<Template>> {
    registry.define(answers.into_template(sample)?)
}

/// The questions the interactive flow asks. A shell implements this over its terminal;
/// the core only decides what to ask and in which order.
pub trait Prompter {
    /// Shows informational text (file preview, column list).
    fn show(&mut self, text: &str) -> Result<()>;
    /// A number in `min..=max`.
    fn ask_number(&mut self, question: &str, min: usize, max: usize) -> Result<usize>;
    /// Free text; an empty answer yields `default` when given.
    fn ask_text(&mut self, question: &str, default: Option<&str>) -> Result<String>;
    /// Index into `options`.
    fn ask_choice(&mut self, question: &str, options: &[String]) -> Result<usize>;
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}

/// Walks the user through characterizing `sample` and stores the resulting template.
pub fn define_template_interactively<P: Prompter + ?Sized>(
    registry: &TemplateRegistry,
    prompter: &mut P,
    sample: &RawTable,
    preview_lines: usize,
) -> Result<Arc<Template>> {
    let total = sample.len();
    if total < 2 {
        return Err(NormalizeError::InvalidBoundary {
            header_line: 1,
            first_data_line: 2,
            last_data_line: 2,
            total_lines: total,
        });
    }

    let preview: Vec<String> = sample
        .preview(1, preview_lines)
        .map(|(n, line)| format!("{:5}: {}", n, line))
        .collect();
    prompter.show(&preview.join("\n"))?;

    let name = prompter.ask_text("Template name", None)?;
    let header_line = prompter.ask_number("Line number containing column names", 1, total - 1)?;
    let first_data_line =
        prompter.ask_number("First line of data", header_line + 1, total)?;
    let last_data_line = prompter.ask_number("Last line of data", first_data_line, total)?;
    let boundary = BoundarySpec::new(header_line, first_data_line, last_data_line);

    let trailing = total - last_data_line;
    let relative = if trailing == 0 {
        prompter.confirm("Read data to the end of every file of this format?", true)?
    } else {
        prompter.confirm(
            &format!(
                "Are the last {} lines a footer that every file of this format ends with?",
                trailing
            ),
            true,
        )?
    };
    let data_end = if relative {
        DataEnd::EndOfFile {
            footer_lines: trailing,
        }
    } else {
        DataEnd::Fixed
    };

    let delimiter: Delimiter = prompter
        .ask_text("Delimiter (blank to detect)", Some(""))?
        .parse()?;
    let fields = header_fields(sample, &boundary, delimiter)?;
    prompter.show(&format!("Columns: {}", fields.join(", ")))?;

    let mut answers = TemplateAnswers::new(name, boundary);
    answers.delimiter = delimiter;
    answers.data_end = data_end;

    if prompter.confirm("Does the file already have a total elapsed time column?", false)? {
        let idx = prompter.ask_choice("Elapsed time column", &fields)?;
        answers.time_column = Some(fields[idx].clone());
    } else {
        answers.time_derivation = Some(ask_time_derivation(prompter, &fields)?);
    }

    answers.flags.convert_angles =
        prompter.confirm("Convert latitude/longitude from degrees to radians?", true)?;
    if answers.flags.convert_angles {
        loop {
            let lat = prompter.ask_choice("Latitude column", &fields)?;
            let lon = prompter.ask_choice("Longitude column", &fields)?;
            answers.latitude_columns.push(fields[lat].clone());
            answers.longitude_columns.push(fields[lon].clone());
            if !prompter.confirm("Add another latitude/longitude pair?", false)? {
                break;
            }
        }
    }

    define_template(registry, answers, Some(sample))
}

fn ask_time_derivation<P: Prompter + ?Sized>(
    prompter: &mut P,
    fields: &[String],
) -> Result<TimeDerivation> {
    let source = prompter.ask_choice("Column to derive elapsed time from", fields)?;

    let rules = vec![
        "cumulative delta from the first row".to_string(),
        "already elapsed seconds (copy)".to_string(),
    ];
    let rule = match prompter.ask_choice("How is elapsed time computed?", &rules)? {
        0 => TimeRule::CumulativeDelta,
        _ => TimeRule::Passthrough,
    };

    let formats = vec![
        "decimal seconds".to_string(),
        "clock [[H:]M:]S[.fff]".to_string(),
        "date/time pattern".to_string(),
    ];
    let format = match prompter.ask_choice("How are the values written?", &formats)? {
        0 => TimeFormat::Seconds,
        1 => TimeFormat::Clock,
        _ => TimeFormat::Pattern(prompter.ask_text(
            "chrono pattern (e.g. %Y-%m-%d %H:%M:%S%.f)",
            None,
        )?),
    };

    let output = prompter.ask_text("Name of the elapsed time column", Some(DEFAULT_TIME_COLUMN))?;
    Ok(TimeDerivation::new(fields[source].clone())
        .with_rule(rule)
        .with_format(format)
        .with_output(output))
}

pub fn list_templates(registry: &TemplateRegistry) -> Vec<String> {
    registry.names()
}

/// Which template an import uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    Named(String),
    Inline(Template),
    /// Whichever stored template's header signature matches the file.
    Detect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ImportJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub template: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub time_column: Option<String>,
    pub elapsed: Duration,
}

fn resolve_source(
    snapshot: &RegistrySnapshot,
    source: &ImportSource,
    raw: &RawTable,
    input: &Path,
) -> Result<Arc<Template>> {
    match source {
        ImportSource::Named(name) => snapshot.resolve(name),
        ImportSource::Inline(template) => {
            template.validate()?;
            Ok(Arc::new(template.clone()))
        }
        ImportSource::Detect => snapshot
            .find_matching(raw)
            .ok_or_else(|| NormalizeError::NoMatchingTemplate(input.display().to_string())),
    }
}

/// Normalizes one file with the registry as it is right now.
pub fn run_import(
    registry: &TemplateRegistry,
    source: &ImportSource,
    job: &ImportJob,
    output_delimiter: u8,
) -> Result<ImportReport> {
    run_import_with(&registry.snapshot(), source, job, output_delimiter)
}

#[instrument(level = "info", skip(snapshot, source), fields(input = %job.input.display()))]
pub fn run_import_with(
    snapshot: &RegistrySnapshot,
    source: &ImportSource,
    job: &ImportJob,
    output_delimiter: u8,
) -> Result<ImportReport> {
    let start = Instant::now();
    let raw = RawTable::read(&job.input)?;
    let template = resolve_source(snapshot, source, &raw, &job.input)?;
    let (table, report) = apply_with_report(&template, &raw)?;
    write_output(&table, &job.output, output_delimiter)?;

    let report = ImportReport {
        input: job.input.clone(),
        output: job.output.clone(),
        template: template.name.clone(),
        rows: table.num_rows(),
        columns: table.headers().into_iter().map(String::from).collect(),
        time_column: report.time_column,
        elapsed: start.elapsed(),
    };
    info!(
        template = %report.template,
        rows = report.rows,
        output = %report.output.display(),
        elapsed = ?report.elapsed,
        "normalized"
    );
    Ok(report)
}

/// Runs every job in parallel against one snapshot of the registry.
/// Results come back in job order; one failure does not stop the others.
/// Jobs that share an output path all fail with `DuplicateOutput` and write nothing.
pub fn run_imports(
    registry: &TemplateRegistry,
    source: &ImportSource,
    jobs: &[ImportJob],
    output_delimiter: u8,
) -> Vec<Result<ImportReport>> {
    let snapshot = registry.snapshot();
    let mut writers: HashMap<&Path, usize> = HashMap::with_capacity(jobs.len());
    for job in jobs {
        *writers.entry(job.output.as_path()).or_default() += 1;
    }

    jobs.par_iter()
        .map(|job| {
            let count = writers.get(job.output.as_path()).copied().unwrap_or(0);
            let result = if count > 1 {
                Err(NormalizeError::DuplicateOutput {
                    path: job.output.display().to_string(),
                    count,
                })
            } else {
                run_import_with(&snapshot, source, job, output_delimiter)
            };
            if let Err(e) = &result {
                error!(input = %job.input.display(), "import failed: {}", e);
            }
            result
        })
        .collect()
}

/// Writes `table` to `path` through a temp file in the same directory.
pub fn write_output(table: &NormalizedTable, path: &Path, delimiter: u8) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.csv".to_string());
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    let written = (|| -> Result<()> {
        let mut w = BufWriter::new(File::create(&tmp_path)?);
        table.write_csv(&mut w, delimiter)?;
        w.flush()?;
        Ok(())
    })()
    .and_then(|_| fs::rename(&tmp_path, path).map_err(NormalizeError::from));

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::f64::consts::PI;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,dlognorm=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const TELEMETRY: &str = "\
timestamp,speed,lat_deg,lon_deg
100.0,10,20.0,30.0
100.5,11,20.5,30.5
101.0,12,21.0,31.0
";

    fn fmt_a() -> Template {
        Template::new("fmtA", BoundarySpec::new(1, 2, 4))
            .with_role("lat_deg", ColumnRole::Latitude)
            .with_role("lon_deg", ColumnRole::Longitude)
            .with_time_derivation(TimeDerivation::new("timestamp"))
    }

    fn parse_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        let headers = rdr.headers().unwrap().iter().map(String::from).collect();
        let rows = rdr
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn telemetry_round_trip() -> anyhow::Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let input = dir.path().join("run.csv");
        fs::write(&input, TELEMETRY)?;
        let output = dir.path().join("out").join("run_dlog.csv");

        let registry = TemplateRegistry::open(dir.path().join("templates"))?;
        registry.define(fmt_a())?;

        let report = run_import(
            &registry,
            &ImportSource::Named("fmtA".into()),
            &ImportJob::new(&input, &output),
            b',',
        )?;
        assert_eq!(report.rows, 3);
        assert_eq!(report.time_column.as_deref(), Some("elapsed_time"));

        let (headers, rows) = parse_output(&output);
        assert_eq!(headers, vec!["elapsed_time", "speed", "lat_rad", "lon_rad"]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].parse::<f64>()?, 0.0);
        assert_eq!(rows[1][0].parse::<f64>()?, 0.5);
        assert_eq!(rows[0][1], "10");
        assert_eq!(rows[0][2].parse::<f64>()?, 20.0 * (PI / 180.0));
        assert_eq!(rows[0][3].parse::<f64>()?, 30.0 * (PI / 180.0));
        Ok(())
    }

    #[test]
    fn named_and_inline_templates_produce_identical_files() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("run.csv");
        fs::write(&input, TELEMETRY)?;

        let registry = TemplateRegistry::in_memory();
        registry.define(fmt_a())?;
        let resolved = registry.resolve("fmtA")?;
        assert_eq!(*resolved, fmt_a());

        let named = dir.path().join("named.csv");
        let inline = dir.path().join("inline.csv");
        run_import(
            &registry,
            &ImportSource::Named("fmtA".into()),
            &ImportJob::new(&input, &named),
            b',',
        )?;
        run_import(
            &registry,
            &ImportSource::Inline(fmt_a()),
            &ImportJob::new(&input, &inline),
            b',',
        )?;
        assert_eq!(fs::read(&named)?, fs::read(&inline)?);
        Ok(())
    }

    #[test]
    fn detect_uses_the_header_signature() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("run.csv");
        fs::write(&input, TELEMETRY)?;
        let raw = RawTable::read(&input)?;

        let registry = TemplateRegistry::in_memory();
        registry.define(fmt_a().with_signature_from(&raw)?)?;

        let report = run_import(
            &registry,
            &ImportSource::Detect,
            &ImportJob::new(&input, dir.path().join("o.csv")),
            b';',
        )?;
        assert_eq!(report.template, "fmtA");
        let text = fs::read_to_string(dir.path().join("o.csv"))?;
        assert!(text.starts_with("elapsed_time;speed;lat_rad;lon_rad\n"));

        let other = dir.path().join("other.csv");
        fs::write(&other, "a,b\n1,2\n")?;
        let err = run_import(
            &registry,
            &ImportSource::Detect,
            &ImportJob::new(&other, dir.path().join("o2.csv")),
            b',',
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::NoMatchingTemplate(_)));
        Ok(())
    }

    #[test]
    fn failed_import_leaves_no_output() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("short.csv");
        fs::write(&input, "timestamp,speed,lat_deg,lon_deg\n100.0,10,20.0\n")?;
        let output = dir.path().join("short_dlog.csv");

        let template = Template::new("short", BoundarySpec::new(1, 2, 2))
            .with_time_derivation(TimeDerivation::new("timestamp"));
        let err = run_import(
            &TemplateRegistry::in_memory(),
            &ImportSource::Inline(template),
            &ImportJob::new(&input, &output),
            b',',
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::MalformedRow {
                line: 2,
                expected: 4,
                found: 3
            }
        ));
        assert!(!output.exists());

        let missing = run_import(
            &TemplateRegistry::in_memory(),
            &ImportSource::Named("nope".into()),
            &ImportJob::new(&input, &output),
            b',',
        )
        .unwrap_err();
        assert!(matches!(missing, NormalizeError::TemplateNotFound(_)));
        Ok(())
    }

    #[test]
    fn batch_runs_every_job() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let registry = TemplateRegistry::in_memory();
        registry.define(fmt_a())?;

        let mut jobs = Vec::new();
        for i in 0..6 {
            let input = dir.path().join(format!("run{}.csv", i));
            if i == 3 {
                fs::write(&input, "timestamp,speed\n1,2\n")?;
            } else {
                fs::write(&input, TELEMETRY)?;
            }
            jobs.push(ImportJob::new(&input, dir.path().join(format!("out{}.csv", i))));
        }

        let results = run_imports(&registry, &ImportSource::Named("fmtA".into()), &jobs, b',');
        assert_eq!(results.len(), 6);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.is_err(), i == 3, "job {}", i);
        }
        let first = fs::read(dir.path().join("out0.csv"))?;
        assert_eq!(first, fs::read(dir.path().join("out5.csv"))?);
        Ok(())
    }

    /// Replays canned answers.
    #[derive(Default)]
    struct Scripted {
        numbers: VecDeque<usize>,
        texts: VecDeque<String>,
        choices: VecDeque<usize>,
        confirms: VecDeque<bool>,
        shown: Vec<String>,
    }

    impl Prompter for Scripted {
        fn show(&mut self, text: &str) -> Result<()> {
            self.shown.push(text.to_string());
            Ok(())
        }
        fn ask_number(&mut self, _q: &str, min: usize, max: usize) -> Result<usize> {
            let n = self.numbers.pop_front().unwrap();
            assert!((min..=max).contains(&n), "{} not in {}..={}", n, min, max);
            Ok(n)
        }
        fn ask_text(&mut self, _q: &str, default: Option<&str>) -> Result<String> {
            let t = self.texts.pop_front().unwrap();
            Ok(match (t.is_empty(), default) {
                (true, Some(d)) => d.to_string(),
                _ => t,
            })
        }
        fn ask_choice(&mut self, _q: &str, options: &[String]) -> Result<usize> {
            let c = self.choices.pop_front().unwrap();
            assert!(c < options.len());
            Ok(c)
        }
        fn confirm(&mut self, _q: &str, _default: bool) -> Result<bool> {
            Ok(self.confirms.pop_front().unwrap())
        }
    }

    #[test]
    fn interactive_definition_matches_manual_one() -> anyhow::Result<()> {
        let sample = RawTable::from_text(TELEMETRY);
        let registry = TemplateRegistry::in_memory();
        let mut prompter = Scripted {
            numbers: VecDeque::from(vec![1, 2, 4]),
            texts: VecDeque::from(vec!["fmtA".to_string(), "".into(), "".into()]),
            // source=timestamp, cumulative delta, seconds, lat=lat_deg, lon=lon_deg
            choices: VecDeque::from(vec![0, 0, 0, 2, 3]),
            // read to end of file, no time column, convert angles, no second pair
            confirms: VecDeque::from(vec![true, false, true, false]),
            ..Default::default()
        };

        let template = define_template_interactively(&registry, &mut prompter, &sample, 20)?;
        assert!(prompter.shown[0].starts_with("    1: timestamp"));
        assert_eq!(prompter.shown[1], "Columns: timestamp, speed, lat_deg, lon_deg");

        let manual = fmt_a()
            .with_data_end(DataEnd::EndOfFile { footer_lines: 0 })
            .with_signature_from(&sample)?;
        assert_eq!(*template, manual);
        assert_eq!(list_templates(&registry), vec!["fmtA"]);
        Ok(())
    }

    #[test]
    fn answers_must_reference_sample_columns() {
        let sample = RawTable::from_text(TELEMETRY);
        let mut answers = TemplateAnswers::new("typo", BoundarySpec::new(1, 2, 4));
        answers.time_column = Some("timestamp".into());
        answers.latitude_columns.push("lat".into());
        let err = define_template(&TemplateRegistry::in_memory(), answers, Some(&sample))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownColumn(c) if c == "lat"));
    }

    #[test]
    fn one_column_cannot_take_two_roles() {
        let registry = TemplateRegistry::in_memory();
        let mut answers = TemplateAnswers::new("clash", BoundarySpec::new(1, 2, 4));
        answers.time_column = Some("timestamp".into());
        answers.latitude_columns.push("timestamp".into());
        answers.longitude_columns.push("lon_deg".into());
        let err = define_template(&registry, answers, None).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidTemplate(_)));
        assert!(err.is_configuration());
        assert!(registry.is_empty());

        let mut same_role_twice = TemplateAnswers::new("pairs", BoundarySpec::new(1, 2, 4));
        same_role_twice.time_column = Some("timestamp".into());
        same_role_twice.latitude_columns = vec!["lat_deg".into(), "lat_deg".into()];
        assert!(define_template(&registry, same_role_twice, None).is_ok());
    }

    #[test]
    fn time_column_and_derivation_cannot_both_be_given() {
        let mut answers = TemplateAnswers::new("both", BoundarySpec::new(1, 2, 4));
        answers.time_column = Some("speed".into());
        answers.time_derivation = Some(TimeDerivation::new("timestamp"));
        let err = define_template(&TemplateRegistry::in_memory(), answers, None).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidTemplate(_)));
    }

    #[test]
    fn jobs_sharing_an_output_are_refused() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let registry = TemplateRegistry::in_memory();
        registry.define(fmt_a())?;

        let out_dir = dir.path().join("out");
        let mut jobs = Vec::new();
        for sub in ["a", "b", "c"] {
            fs::create_dir_all(dir.path().join(sub))?;
            let input = dir.path().join(sub).join(if sub == "c" { "other.csv" } else { "run.csv" });
            fs::write(&input, TELEMETRY)?;
            let output = crate::utils::default_output_path(&input, Some(&out_dir));
            jobs.push(ImportJob::new(input, output));
        }

        let results = run_imports(&registry, &ImportSource::Named("fmtA".into()), &jobs, b',');
        for result in &results[..2] {
            assert!(matches!(
                result,
                Err(NormalizeError::DuplicateOutput { count: 2, .. })
            ));
        }
        assert!(results[2].is_ok());
        assert!(!out_dir.join("run_dlog.csv").exists());
        assert!(out_dir.join("other_dlog.csv").exists());
        Ok(())
    }
}
