use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use dlognorm::{
    config::Settings,
    define_template_interactively, list_templates, run_imports,
    template::Template,
    utils::{clean_str, default_output_path},
    ImportJob, ImportSource, NormalizeError, Prompter, RawTable, TemplateRegistry,
};
use glob::glob;
use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Normalize vendor telemetry CSV exports into DLOG99-ready CSV"
)]
struct Cli {
    /// YAML settings file (defaults to $DLOGNORM_CONFIG, then ./dlognorm.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides `templates_dir` from the settings file
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored template names
    List,
    /// Print one stored template as JSON
    Show { name: String },
    /// Store a template, from a JSON/YAML file or by answering questions about a sample file
    #[command(group(ArgGroup::new("mode").required(true).args(["from", "interactive"])))]
    Define {
        #[arg(long)]
        from: Option<PathBuf>,
        #[arg(long, requires = "sample")]
        interactive: bool,
        /// File the template is characterized on; its header becomes the signature
        #[arg(long)]
        sample: Option<PathBuf>,
    },
    /// Normalize files
    #[command(group(ArgGroup::new("source").required(true).args(["template", "inline", "detect"])))]
    Run {
        /// Stored template name
        #[arg(short, long)]
        template: Option<String>,
        /// Template file used without storing it
        #[arg(long)]
        inline: Option<PathBuf>,
        /// Pick the stored template whose header signature matches each file
        #[arg(long)]
        detect: bool,
        /// Output file; only valid with a single input
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,
        /// Directory for `<stem>_dlog.csv` outputs (defaults to next to each input)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::discover(cli.config.as_deref())?;
    if let Some(dir) = cli.templates_dir {
        settings.templates_dir = dir;
    }

    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let registry = TemplateRegistry::open(&settings.templates_dir)
        .with_context(|| format!("opening {}", settings.templates_dir.display()))?;

    match cli.command {
        Command::List => {
            for name in list_templates(&registry) {
                println!("{}", name);
            }
        }
        Command::Show { name } => {
            let template = registry.resolve(&name)?;
            println!("{}", serde_json::to_string_pretty(&*template)?);
        }
        Command::Define {
            from,
            interactive,
            sample,
        } => {
            let sample = sample.map(RawTable::read).transpose()?;
            let template = if interactive {
                let sample = sample.context("--interactive needs --sample")?;
                let mut prompter = StdinPrompter::new();
                define_template_interactively(
                    &registry,
                    &mut prompter,
                    &sample,
                    settings.preview_lines,
                )?
            } else {
                let path = from.context("--from or --interactive is required")?;
                let mut template = load_template_file(&path)?;
                if let Some(raw) = &sample {
                    template = template.with_signature_from(raw)?;
                }
                registry.define(template)?
            };
            info!(name = %template.name, "template defined");
        }
        Command::Run {
            template,
            inline,
            detect,
            output,
            output_dir,
            inputs,
        } => {
            let source = match (template, inline, detect) {
                (Some(name), _, _) => ImportSource::Named(name),
                (_, Some(path), _) => ImportSource::Inline(load_template_file(&path)?),
                (_, _, true) => ImportSource::Detect,
                _ => bail!("one of --template, --inline or --detect is required"),
            };

            let files = expand_inputs(&inputs)?;
            if output.is_some() && files.len() != 1 {
                bail!("--output needs exactly one input, got {}", files.len());
            }
            let jobs: Vec<ImportJob> = files
                .into_iter()
                .map(|input| {
                    let out = output
                        .clone()
                        .unwrap_or_else(|| default_output_path(&input, output_dir.as_deref()));
                    ImportJob::new(input, out)
                })
                .collect();

            let start = Instant::now();
            let results = run_imports(&registry, &source, &jobs, settings.output_delimiter_byte()?);
            let failed = results.iter().filter(|r| r.is_err()).count();
            for report in results.iter().flatten() {
                println!(
                    "{} -> {} ({} rows, template {})",
                    report.input.display(),
                    report.output.display(),
                    report.rows,
                    report.template
                );
            }
            info!(
                files = jobs.len(),
                failed,
                elapsed = ?start.elapsed(),
                "run finished"
            );
            if failed > 0 {
                bail!("{} of {} imports failed", failed, jobs.len());
            }
        }
    }
    Ok(())
}

fn load_template_file(path: &Path) -> Result<Template> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let template: Template = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    Ok(template)
}

/// Literal paths pass through; anything else is treated as a glob pattern.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for raw in inputs {
        let pattern = clean_str(raw);
        let literal = PathBuf::from(&pattern);
        if literal.is_file() {
            files.push(literal);
            continue;
        }
        let before = files.len();
        for entry in glob(&pattern).with_context(|| format!("bad pattern {}", pattern))? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("unreadable glob entry: {}", e),
            }
        }
        if files.len() == before {
            error!(pattern = %pattern, "no input files matched");
        }
    }
    if files.is_empty() {
        bail!("no input files");
    }
    Ok(files)
}

/// Asks on stdout, reads answers from stdin, and asks again until an answer is usable.
struct StdinPrompter {
    stdin: io::Stdin,
}

impl StdinPrompter {
    fn new() -> Self {
        Self { stdin: io::stdin() }
    }

    fn read_answer(&mut self, question: &str) -> dlognorm::Result<String> {
        print!("{}: ", question);
        io::stdout().flush()?;
        let mut line = String::new();
        if self.stdin.lock().read_line(&mut line)? == 0 {
            return Err(NormalizeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed",
            )));
        }
        Ok(clean_str(&line))
    }
}

impl Prompter for StdinPrompter {
    fn show(&mut self, text: &str) -> dlognorm::Result<()> {
        println!("{}", text);
        Ok(())
    }

    fn ask_number(&mut self, question: &str, min: usize, max: usize) -> dlognorm::Result<usize> {
        loop {
            let answer = self.read_answer(&format!("{} [{}-{}]", question, min, max))?;
            match answer.parse::<usize>() {
                Ok(n) if (min..=max).contains(&n) => return Ok(n),
                _ => println!("enter a number between {} and {}", min, max),
            }
        }
    }

    fn ask_text(&mut self, question: &str, default: Option<&str>) -> dlognorm::Result<String> {
        loop {
            let prompt = match default {
                Some(d) if !d.is_empty() => format!("{} [{}]", question, d),
                _ => question.to_string(),
            };
            let answer = self.read_answer(&prompt)?;
            match (answer.is_empty(), default) {
                (false, _) => return Ok(answer),
                (true, Some(d)) => return Ok(d.to_string()),
                (true, None) => println!("an answer is required"),
            }
        }
    }

    fn ask_choice(&mut self, question: &str, options: &[String]) -> dlognorm::Result<usize> {
        for (i, option) in options.iter().enumerate() {
            println!("  {:3}) {}", i + 1, option);
        }
        let n = self.ask_number(question, 1, options.len())?;
        Ok(n - 1)
    }

    fn confirm(&mut self, question: &str, default: bool) -> dlognorm::Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.read_answer(&format!("{} [{}]", question, hint))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("answer y or n"),
            }
        }
    }
}
