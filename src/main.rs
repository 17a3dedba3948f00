use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Args, Parser, Subcommand};
use dialects::{alphafold_server, Dialect, OutputFile, ProtenixMode};
use glycan::{anchor, AttachmentSite, GlycanGraph, LinkageTable};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, IntoDiagnostic, Report, WrapErr};
use rustyline::DefaultEditor;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Converts glycans in bracket notation into inputs for structure-prediction models
#[derive(Parser, Debug)]
#[command(name = "glyconv", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single glycan, like NAG(NAG(MAN))
    Convert {
        glycan: String,

        /// The protein atom the glycan is attached to, like A:N5 or A:5:ND2
        #[arg(long)]
        anchor: Option<AttachmentSite>,

        /// The name written files start with
        #[arg(long, default_value = "glycan")]
        stem: String,

        #[command(flatten)]
        targets: Targets,
    },
    /// Convert every glycan of an AlphaFold Server job
    Job {
        file: PathBuf,

        #[command(flatten)]
        targets: Targets,
    },
    /// Read glycans interactively and print their bonds
    Repl {
        /// A KDL file of linkage rules, replacing the built-in N-glycan core table
        #[arg(long)]
        linkages: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct Targets {
    /// The formats to write: alphafold3, boltz, chai, or protenix[:combined|:split]
    #[arg(long = "to", required = true)]
    dialects: Vec<Dialect>,

    /// Overrides the mode of every protenix target
    #[arg(long)]
    protenix_mode: Option<ProtenixMode>,

    /// A KDL file of linkage rules, replacing the built-in N-glycan core table
    #[arg(long)]
    linkages: Option<PathBuf>,

    /// Write files into this directory instead of printing them
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install the logger: {error}");
    }

    let succeeded = match cli.command {
        Command::Convert {
            glycan,
            anchor,
            stem,
            targets,
        } => load_linkages(targets.linkages.as_deref())
            .map(|linkages| convert(&linkages, &glycan, anchor.as_ref(), &stem, &targets)),
        Command::Job { file, targets } => job(&file, &targets),
        Command::Repl { linkages } => load_linkages(linkages.as_deref()).and_then(|linkages| repl(&linkages)),
    };

    match succeeded {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(report) => {
            render_error(&*report);
            ExitCode::FAILURE
        }
    }
}

fn load_linkages(path: Option<&Path>) -> miette::Result<LinkageTable> {
    let Some(path) = path else {
        return Ok(LinkageTable::default());
    };
    let kdl = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read the linkage table {}", path.display()))?;
    let linkages = LinkageTable::new(path.display().to_string(), kdl)?;
    info!(path = %path.display(), "loaded linkage table");
    Ok(linkages)
}

// Conversion ==========================================================================================================

/// Renders every target independently, returning `false` if any of them failed
fn convert(
    linkages: &LinkageTable,
    glycan: &str,
    site: Option<&AttachmentSite>,
    stem: &str,
    targets: &Targets,
) -> bool {
    let graph = match GlycanGraph::new(linkages, glycan) {
        Ok(graph) => graph,
        Err(error) => {
            render_error(&error);
            return false;
        }
    };
    let ambiguous = graph.ambiguous_branch_points();
    if !ambiguous.is_empty() {
        info!(?ambiguous, %glycan, "branches were ordered by position alone");
    }
    let anchor = anchor::resolve(&graph, site);

    let mut succeeded = true;
    for &dialect in &targets.dialects {
        let dialect = match (dialect, targets.protenix_mode) {
            (Dialect::Protenix(_), Some(mode)) => Dialect::Protenix(mode),
            (dialect, _) => dialect,
        };
        let written = dialect
            .render(&graph, anchor.as_ref())
            .and_then(|document| document.files())
            .map_err(Report::new)
            .and_then(|files| write_files(&files, stem, targets));
        if let Err(report) = written {
            render_error(&*report.wrap_err(format!("failed to convert {glycan} for {dialect}")));
            succeeded = false;
        }
    }
    succeeded
}

fn job(path: &Path, targets: &Targets) -> miette::Result<bool> {
    let linkages = load_linkages(targets.linkages.as_deref())?;
    let json = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read the job {}", path.display()))?;
    let glycans = alphafold_server::read_job(&json)?;
    info!(path = %path.display(), glycans = glycans.len(), "read AlphaFold Server job");

    let job_stem = path.file_stem().map_or_else(|| "job".into(), |s| s.to_string_lossy());
    let mut succeeded = true;
    for (n, glycan) in glycans.iter().enumerate() {
        let stem = format!("{job_stem}_{}", n + 1);
        succeeded &= convert(&linkages, &glycan.residues, Some(&glycan.site), &stem, targets);
    }
    Ok(succeeded)
}

fn write_files(files: &[OutputFile], stem: &str, targets: &Targets) -> miette::Result<()> {
    let Some(out) = &targets.out else {
        // Headers are only needed to tell several documents apart
        let headers = targets.dialects.len() > 1 || files.len() > 1;
        for file in files {
            if headers {
                println!("==> {stem}.{} <==", file.extension);
            }
            print!("{}", file.contents);
        }
        return Ok(());
    };

    fs::create_dir_all(out)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to create {}", out.display()))?;
    for file in files {
        let path = out.join(format!("{stem}.{}", file.extension));
        fs::write(&path, &file.contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote file");
    }
    Ok(())
}

// Interactive Mode ====================================================================================================

fn repl(linkages: &LinkageTable) -> miette::Result<bool> {
    let mut rl = DefaultEditor::new().into_diagnostic()?;
    while let Ok(glycan) = rl.readline("Glycan: ") {
        rl.add_history_entry(&glycan).into_diagnostic()?;
        match GlycanGraph::new(linkages, &glycan) {
            Ok(graph) => println!("{graph}\n"),
            Err(error) => render_error(&error),
        }
    }
    Ok(true)
}

fn render_error(diagnostic: &dyn Diagnostic) {
    let mut buf = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode());
    if handler.render_report(&mut buf, diagnostic).is_err() {
        eprintln!("{diagnostic}");
        return;
    }
    eprintln!("{buf}");
}
