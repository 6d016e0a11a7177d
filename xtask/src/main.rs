use anyhow::{anyhow, bail, Context, Result};
use fbank::kernel::KernelLifecycle;
use fbank::signal::filter::design::{
    butter, cheby1, firwin, remez, ripple_deviations, DigitalFilter, FilterBandType,
    FilterOutputType, Sos,
};
use fbank::signal::filter::{freqz, sosfilt, SosFiltConfig, SosFiltKernel};
use fbank::signal::filterbank::{chroma_bank, mel_bank_slaney, FilterBank};
use fbank::signal::traits::SosFilt1D;
use fbank::signal::windows::Window;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const DEFAULT_PYTHON_BIN: &str = "python";

// Frequencies cross the boundary in cycles/sample; scipy wants them relative
// to Nyquist, hence the doubling below.
const PY_REFERENCE_SCRIPT: &str = r#"
import json
import sys
import time
import numpy as np
import scipy
import scipy.signal

env = json.loads(sys.stdin.read())
op = env["op"]
iters = int(env["iters"])
p = env["payload"]

def _as_array(key):
    return np.asarray(p[key], dtype=float)

def _flat(v):
    return np.asarray(v, dtype=float).reshape(-1)

def _compute():
    if op == "butter_ba":
        b, a = scipy.signal.butter(int(p["order"]), 2.0 * _as_array("cutoff"), btype=p["btype"])
        return np.concatenate([b, a])
    if op == "cheby1_ba":
        b, a = scipy.signal.cheby1(
            int(p["order"]), float(p["ripple_db"]), 2.0 * _as_array("cutoff"), btype=p["btype"]
        )
        return np.concatenate([b, a])
    if op == "firwin":
        return scipy.signal.firwin(
            int(p["numtaps"]), 2.0 * _as_array("cutoff"), window=p["window"], pass_zero=p["pass_zero"]
        )
    if op == "remez":
        return scipy.signal.remez(
            int(p["numtaps"]), _as_array("edges"), _as_array("desired"), weight=_as_array("weights"), fs=1.0
        )
    if op == "sosfilt":
        sos = _as_array("sos").reshape((-1, 6))
        return scipy.signal.sosfilt(sos, _as_array("x"))
    if op == "freqz_abs":
        _, h = scipy.signal.freqz(_as_array("b"), _as_array("a"), worN=int(p["n"]))
        return np.abs(h)
    if op == "mel_slaney":
        import librosa
        return librosa.filters.mel(
            sr=float(p["sr"]),
            n_fft=int(p["n_fft"]),
            n_mels=int(p["n_mels"]),
            fmin=float(p["fmin"]),
            fmax=float(p["fmax"]),
            htk=False,
            norm="slaney",
        )
    if op == "chroma":
        import librosa
        return librosa.filters.chroma(sr=float(p["sr"]), n_fft=int(p["n_fft"]))

    raise RuntimeError(f"unsupported op: {op}")

y = _flat(_compute())

t0 = time.perf_counter_ns()
for _ in range(iters):
    _compute()
t1 = time.perf_counter_ns()

print(json.dumps({
    "output": y.tolist(),
    "avg_ns": (t1 - t0) / max(iters, 1),
    "python_version": sys.version.split()[0],
    "numpy_version": np.__version__,
    "scipy_version": scipy.__version__,
}))
"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct PythonEval {
    output: Vec<f64>,
    avg_ns: f64,
    python_version: String,
    numpy_version: String,
    scipy_version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ContractRow {
    case_id: String,
    pearson_r: f64,
    mae: f64,
    rmse: f64,
    max_abs: f64,
    rust_ns: f64,
    python_ns: f64,
    speedup_vs_python: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContractBundle {
    generated_epoch_seconds: u64,
    python_executable: String,
    python_version: String,
    numpy_version: String,
    scipy_version: String,
    rows: Vec<ContractRow>,
}

/// One design compared against its Python reference.
struct Case<'a> {
    id: &'a str,
    op: &'a str,
    payload: serde_json::Value,
    iters: usize,
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("contracts") => run_contracts(),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- contracts");
            Ok(())
        }
    }
}

fn run_contracts() -> Result<()> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/contracts/{ts}"));
    fs::create_dir_all(&out_dir).context("creating contract output directory")?;

    let python_bin = detect_python_bin();
    let mut rows = Vec::new();

    // Shared synthetic input for the filtering cases.
    let signal: Vec<f64> = (0..512)
        .map(|i| {
            let x = i as f64 / 27.0;
            x.sin() + 0.35 * (2.3 * x).cos() + 0.1 * (7.0 * x).sin()
        })
        .collect();

    // Butterworth
    let versions = {
        let cutoff = [0.1];
        let design = || {
            butter(4, &cutoff, FilterBandType::Lowpass, FilterOutputType::Ba)
                .map_err(|e| anyhow!("butter design failed: {e}"))
        };
        let candidate = flatten_ba(design()?)?;
        let rust_ns = benchmark_avg_ns(200, || design().map(|_| ()))?;
        let case = Case {
            id: "butter_lowpass_order4_ba",
            op: "butter_ba",
            payload: json!({ "order": 4, "cutoff": cutoff, "btype": "lowpass" }),
            iters: 200,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?
    };

    // Chebyshev I bandpass
    {
        let cutoff = [0.1, 0.2];
        let design = || {
            cheby1(3, 1.0, &cutoff, FilterBandType::Bandpass, FilterOutputType::Ba)
                .map_err(|e| anyhow!("cheby1 design failed: {e}"))
        };
        let candidate = flatten_ba(design()?)?;
        let rust_ns = benchmark_avg_ns(200, || design().map(|_| ()))?;
        let case = Case {
            id: "cheby1_bandpass_order3_ba",
            op: "cheby1_ba",
            payload: json!({
                "order": 3,
                "ripple_db": 1.0,
                "cutoff": cutoff,
                "btype": "bandpass"
            }),
            iters: 200,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?;
    }

    // Windowed sinc
    {
        let design = || {
            firwin(51, FilterBandType::Lowpass, &[0.1], Window::Hamming)
                .map_err(|e| anyhow!("firwin design failed: {e}"))
        };
        let candidate = design()?;
        let rust_ns = benchmark_avg_ns(200, || design().map(|_| ()))?;
        let case = Case {
            id: "firwin_lowpass_51",
            op: "firwin",
            payload: json!({
                "numtaps": 51,
                "cutoff": [0.1],
                "window": "hamming",
                "pass_zero": true
            }),
            iters: 200,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?;
    }

    // Equiripple
    {
        let (dp, ds) = ripple_deviations(0.5, 40.0);
        let edges = [0.0, 0.1, 0.2, 0.5];
        let desired = [1.0, 0.0];
        let weights = [1.0, dp / ds];
        let design = || {
            remez(45, &edges, &desired, &weights)
                .map_err(|e| anyhow!("remez design failed: {e}"))
        };
        let candidate = design()?;
        let rust_ns = benchmark_avg_ns(50, || design().map(|_| ()))?;
        let case = Case {
            id: "remez_lowpass_45",
            op: "remez",
            payload: json!({
                "numtaps": 45,
                "edges": edges,
                "desired": desired,
                "weights": weights
            }),
            iters: 50,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?;
    }

    // Cascade filtering
    {
        let DigitalFilter::Sos(sos) =
            butter(4, &[0.05, 0.15], FilterBandType::Bandpass, FilterOutputType::Sos)
                .map_err(|e| anyhow!("butter design failed: {e}"))?
        else {
            bail!("expected sos output");
        };
        let kernel = SosFiltKernel::try_new(SosFiltConfig { sos: sos.clone() })?;
        let candidate = kernel
            .run_alloc(signal.as_slice())
            .map_err(|e| anyhow!("sosfilt execution failed: {e}"))?;
        let rust_ns = benchmark_avg_ns(200, || {
            let _ = sosfilt(&sos, &signal);
            Ok(())
        })?;
        let case = Case {
            id: "sosfilt_butter_bandpass",
            op: "sosfilt",
            payload: json!({ "sos": flatten_sos(&sos), "x": signal }),
            iters: 200,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?;
    }

    // Frequency response
    {
        let DigitalFilter::Ba(ba) =
            butter(6, &[0.2], FilterBandType::Highpass, FilterOutputType::Ba)
                .map_err(|e| anyhow!("butter design failed: {e}"))?
        else {
            bail!("expected ba output");
        };
        let (_, h) = freqz(&ba.b, &ba.a, 256);
        let candidate: Vec<f64> = h.iter().map(|v| v.norm()).collect();
        let rust_ns = benchmark_avg_ns(200, || {
            let _ = freqz(&ba.b, &ba.a, 256);
            Ok(())
        })?;
        let case = Case {
            id: "freqz_butter_highpass",
            op: "freqz_abs",
            payload: json!({ "b": ba.b, "a": ba.a, "n": 256 }),
            iters: 200,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?;
    }

    // Slaney mel bank
    {
        let design = || {
            mel_bank_slaney(40, 512, 16000.0, 0.0, 8000.0, true)
                .map_err(|e| anyhow!("mel bank design failed: {e}"))
        };
        let candidate = flatten_bank(&design()?);
        let rust_ns = benchmark_avg_ns(50, || design().map(|_| ()))?;
        let case = Case {
            id: "mel_bank_slaney_40x512",
            op: "mel_slaney",
            payload: json!({
                "sr": 16000.0,
                "n_fft": 512,
                "n_mels": 40,
                "fmin": 0.0,
                "fmax": 8000.0
            }),
            iters: 50,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?;
    }

    // Chroma bank
    {
        let design = || {
            chroma_bank(4096, 22050.0).map_err(|e| anyhow!("chroma bank design failed: {e}"))
        };
        let candidate = flatten_bank(&design()?);
        let rust_ns = benchmark_avg_ns(20, || design().map(|_| ()))?;
        let case = Case {
            id: "chroma_bank_4096",
            op: "chroma",
            payload: json!({ "sr": 22050.0, "n_fft": 4096 }),
            iters: 20,
        };
        record_case(&mut rows, &python_bin, case, candidate, rust_ns)?;
    }

    let bundle = ContractBundle {
        generated_epoch_seconds: ts,
        python_executable: python_bin.to_string_lossy().into_owned(),
        python_version: versions.python_version,
        numpy_version: versions.numpy_version,
        scipy_version: versions.scipy_version.unwrap_or_default(),
        rows,
    };

    let summary_json = out_dir.join("summary.json");
    fs::write(
        &summary_json,
        serde_json::to_vec_pretty(&bundle).context("serializing contract summary")?,
    )
    .with_context(|| format!("writing {}", summary_json.display()))?;
    let summary_csv = out_dir.join("summary.csv");
    write_summary_csv(&summary_csv, &bundle.rows)?;

    println!("Contract artifacts:");
    println!("  - {}", summary_csv.display());
    println!("  - {}", summary_json.display());
    println!("  - cases: {}", bundle.rows.len());

    Ok(())
}

fn detect_python_bin() -> PathBuf {
    std::env::var_os("PYTHON")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON_BIN))
}

fn run_python_eval(python_bin: &Path, case: &Case<'_>) -> Result<PythonEval> {
    let mut child = Command::new(python_bin)
        .arg("-c")
        .arg(PY_REFERENCE_SCRIPT)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning python interpreter at {}", python_bin.display()))?;

    {
        let stdin = child.stdin.as_mut().context("opening python stdin")?;
        let payload = json!({
            "op": case.op,
            "iters": case.iters,
            "payload": case.payload
        });
        let payload_bytes = serde_json::to_vec(&payload).context("serializing python payload")?;
        stdin
            .write_all(&payload_bytes)
            .context("writing payload to python stdin")?;
    }

    let output = child
        .wait_with_output()
        .context("waiting for python process")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("python execution failed for {}: {stderr}", case.id);
    }
    let stdout = String::from_utf8(output.stdout).context("parsing python stdout utf8")?;
    serde_json::from_str(stdout.trim()).context("parsing python json")
}

fn record_case(
    rows: &mut Vec<ContractRow>,
    python_bin: &Path,
    case: Case<'_>,
    candidate: Vec<f64>,
    rust_ns: f64,
) -> Result<PythonEval> {
    let py = run_python_eval(python_bin, &case)?;
    if candidate.len() != py.output.len() {
        bail!(
            "case {} has mismatched output lengths: rust={}, python={}",
            case.id,
            candidate.len(),
            py.output.len()
        );
    }
    rows.push(ContractRow {
        case_id: case.id.to_string(),
        pearson_r: pearson(&candidate, &py.output),
        mae: mean_abs_error(&candidate, &py.output),
        rmse: root_mean_squared_error(&candidate, &py.output),
        max_abs: max_abs_error(&candidate, &py.output),
        rust_ns,
        python_ns: py.avg_ns,
        speedup_vs_python: py.avg_ns / rust_ns,
    });
    Ok(py)
}

fn flatten_sos(sos: &[Sos]) -> Vec<f64> {
    let mut out = Vec::with_capacity(sos.len() * 6);
    for section in sos {
        out.extend_from_slice(section.b());
        out.extend_from_slice(section.a());
    }
    out
}

fn flatten_ba(filter: DigitalFilter) -> Result<Vec<f64>> {
    match filter {
        DigitalFilter::Ba(ba) => {
            let mut out = Vec::with_capacity(ba.b.len() + ba.a.len());
            out.extend(ba.b);
            out.extend(ba.a);
            Ok(out)
        }
        _ => bail!("expected BA filter output"),
    }
}

/// Row-major weights, matching numpy's default layout.
fn flatten_bank(bank: &FilterBank) -> Vec<f64> {
    bank.weights().iter().copied().collect()
}

fn benchmark_avg_ns<F>(iters: usize, mut f: F) -> Result<f64>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_nanos() as f64 / iters as f64)
}

fn mean_abs_error(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .sum::<f64>()
        / a.len() as f64
}

fn root_mean_squared_error(a: &[f64], b: &[f64]) -> f64 {
    (a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        / a.len() as f64)
        .sqrt()
}

fn max_abs_error(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = *x - mean_a;
        let db = *y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        if a == b {
            1.0
        } else {
            0.0
        }
    } else {
        cov / (var_a.sqrt() * var_b.sqrt())
    }
}

fn write_summary_csv(path: &Path, rows: &[ContractRow]) -> Result<()> {
    let mut out = String::new();
    out.push_str("case_id,pearson_r,mae,rmse,max_abs,rust_ns,python_ns,speedup_vs_python\n");
    for row in rows {
        out.push_str(&format!(
            "{},{:.12},{:.12},{:.12},{:.12},{:.3},{:.3},{:.6}\n",
            row.case_id,
            row.pearson_r,
            row.mae,
            row.rmse,
            row.max_abs,
            row.rust_ns,
            row.python_ns,
            row.speedup_vs_python,
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
