// trecon - offline reconciliation CLI.
//
// Wires exit codes, typed error mapping, the validate-only short-circuit,
// and the full run path (load → reconcile → artifacts → optional rendering).

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const IO: i32 = 4;
    pub const ENGINE: i32 = 5;
}

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, Args};

use tr_io::{canonical_json, loader, manifest};
use tr_pipeline::{run_loaded, PipelineError, PipelineOutputs};
use tr_report::{build_model, ReportError};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Schema / JSON shape / manifest / digest expectation failures.
    Validation(String),
    /// Filesystem and path errors.
    Io(String),
    /// Engine-side failures (artifact build, canonicalization).
    Engine(String),
    /// Report model or renderer failures.
    Render(String),
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("trecon: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };

    let rc = if args.validate_only {
        match validate_only(&args) {
            Ok(()) => exitcodes::OK,
            Err(e) => report_and_map(&e),
        }
    } else {
        match run_once(&args) {
            Ok(()) => exitcodes::OK,
            Err(e) => report_and_map(&e),
        }
    };

    ExitCode::from(rc as u8)
}

fn report_and_map(e: &MainError) -> i32 {
    use exitcodes::*;
    let (label, msg, rc) = match e {
        MainError::Validation(m) => ("validation", m, VALIDATION),
        MainError::Io(m) => ("io", m, IO),
        MainError::Engine(m) => ("engine", m, ENGINE),
        MainError::Render(m) => ("render", m, ENGINE),
    };
    eprintln!("trecon: {label} error: {msg}");
    rc
}

/// Validate-only path: exercise manifest/schema/digest checks, run nothing.
fn validate_only(args: &Args) -> Result<(), MainError> {
    load_inputs(args)?;
    if !args.quiet {
        eprintln!("validate-only: inputs OK");
    }
    Ok(())
}

fn load_inputs(args: &Args) -> Result<(loader::LoadedSnapshot, Option<String>), MainError> {
    if let Some(man_path) = &args.manifest {
        let resolved = manifest::load_manifest(man_path).map_err(map_io_err)?;
        let loaded = loader::load_from_manifest(&resolved).map_err(map_io_err)?;
        Ok((loaded, resolved.id))
    } else {
        let snap_path = args
            .snapshot
            .as_ref()
            .ok_or_else(|| MainError::Validation("--snapshot required".to_string()))?;
        let (snapshot, snapshot_digest) = loader::load_snapshot(snap_path).map_err(map_io_err)?;
        let params = match &args.params {
            Some(p) => loader::load_params(p).map_err(map_io_err)?,
            None => Default::default(),
        };
        Ok((
            loader::LoadedSnapshot {
                snapshot,
                snapshot_digest,
                params,
            },
            None,
        ))
    }
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let (loaded, manifest_id) = load_inputs(args)?;

    let outs = run_loaded(&loaded, manifest_id.as_deref(), &args.timestamp)
        .map_err(map_pipeline_err)?;

    write_artifacts(&args.out, &outs)?;
    maybe_render_reports(args, &outs)?;

    if !args.quiet {
        eprintln!(
            "run {}: artifacts written to {}",
            outs.run_record.id,
            args.out.display()
        );
    }
    Ok(())
}

fn write_artifacts(out_dir: &Path, outs: &PipelineOutputs) -> Result<(), MainError> {
    fs::create_dir_all(out_dir)
        .map_err(|e| MainError::Io(format!("mkdir {}: {e}", out_dir.display())))?;

    let result_val = serde_json::to_value(&outs.result)
        .map_err(|e| MainError::Engine(format!("result to JSON: {e}")))?;
    canonical_json::write_canonical_file(&out_dir.join("result.json"), &result_val)
        .map_err(|e| MainError::Io(format!("write result.json: {e}")))?;

    let run_val = serde_json::to_value(&outs.run_record)
        .map_err(|e| MainError::Engine(format!("run_record to JSON: {e}")))?;
    canonical_json::write_canonical_file(&out_dir.join("run_record.json"), &run_val)
        .map_err(|e| MainError::Io(format!("write run_record.json: {e}")))?;

    Ok(())
}

fn maybe_render_reports(args: &Args, outs: &PipelineOutputs) -> Result<(), MainError> {
    if args.render.is_empty() {
        return Ok(());
    }

    let result_val = serde_json::to_value(&outs.result)
        .map_err(|e| MainError::Render(format!("result to JSON: {e}")))?;
    let run_val = serde_json::to_value(&outs.run_record)
        .map_err(|e| MainError::Render(format!("run_record to JSON: {e}")))?;
    let model = build_model(&result_val, &run_val).map_err(map_report_err)?;

    for fmt in &args.render {
        match fmt.as_str() {
            "json" => render_json_report(&model, &args.out)?,
            "html" => render_html_report(&model, &args.out)?,
            other => return Err(MainError::Render(format!("unknown renderer: {other}"))),
        }
    }
    Ok(())
}

// Always accept the concrete model type; gate the body by feature.
fn render_json_report(model: &tr_report::ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-json")]
    {
        let text = tr_report::render_json(model).map_err(map_report_err)?;
        return fs::write(out_dir.join("report.json"), text)
            .map_err(|e| MainError::Io(format!("write report.json: {e}")));
    }
    #[cfg(not(feature = "report-json"))]
    {
        let _ = (model, out_dir);
        Err(MainError::Render(
            "json renderer not enabled (build with feature `report-json`)".into(),
        ))
    }
}

fn render_html_report(model: &tr_report::ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-html")]
    {
        let html = tr_report::render_html(model).map_err(map_report_err)?;
        return fs::write(out_dir.join("report.html"), html)
            .map_err(|e| MainError::Io(format!("write report.html: {e}")));
    }
    #[cfg(not(feature = "report-html"))]
    {
        let _ = (model, out_dir);
        Err(MainError::Render(
            "html renderer not enabled (build with feature `report-html`)".into(),
        ))
    }
}

fn map_io_err(e: tr_io::IoError) -> MainError {
    use tr_io::IoError::*;
    match e {
        Schema(m) => MainError::Validation(format!("schema: {m}")),
        Json { pointer, msg } => MainError::Validation(format!("json {pointer}: {msg}")),
        Manifest(m) => MainError::Validation(format!("manifest: {m}")),
        Invalid(m) => MainError::Validation(m),
        Canon(m) => MainError::Engine(format!("canon: {m}")),
        Hash(m) => MainError::Engine(format!("hash: {m}")),
        Path(m) => MainError::Io(m),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    use PipelineError::*;
    match e {
        Schema(m) | Validate(m) => MainError::Validation(m),
        Io(m) => MainError::Io(m),
        Build(m) => MainError::Engine(m),
    }
}

fn map_report_err(e: ReportError) -> MainError {
    use ReportError::*;
    match e {
        Template(m) => MainError::Render(format!("template: {m}")),
        MissingField(m) => MainError::Render(format!("missing: {m}")),
        Inconsistent(m) => MainError::Render(format!("inconsistent: {m}")),
    }
}
