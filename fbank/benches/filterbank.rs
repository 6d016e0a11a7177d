use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dasp_signal::{rate, Signal};
use fbank::kernel::KernelLifecycle;
use fbank::signal::fft::{FourierConfig, FourierKernel};
use fbank::signal::filterbank::{chroma_bank, erb_bank, mel_bank};
use fbank::signal::windows::Window;

const SAMPLE_HZ: f64 = 16000.;
const FFT_SIZE: usize = 512;

/// Power spectrum of one Hann-windowed frame of a 440 Hz sine.
fn sine_power_spectrum() -> Vec<f64> {
    let mut signal = rate(SAMPLE_HZ).const_hz(440.).sine();
    let mut frame: Vec<f64> = (0..400).map(|_| signal.next()).collect();
    Window::Hann.apply(&mut frame);
    let mut fft =
        FourierKernel::try_new(FourierConfig { size: FFT_SIZE }).expect("valid fft size");
    fft.power_spectrum(&frame).expect("frame fits the transform")
}

fn mel_bank_design(c: &mut Criterion) {
    c.bench_function("mel_bank_40x512", |b| {
        b.iter(|| {
            black_box(
                mel_bank(40, FFT_SIZE, SAMPLE_HZ, 20.0, 0.0, None).expect("valid mel bank"),
            );
        });
    });
}

fn erb_bank_design(c: &mut Criterion) {
    c.bench_function("erb_bank_32x512", |b| {
        b.iter(|| {
            black_box(
                erb_bank(32, FFT_SIZE, SAMPLE_HZ, 50.0, 0.0, true).expect("valid erb bank"),
            );
        });
    });
}

fn chroma_bank_design(c: &mut Criterion) {
    c.bench_function("chroma_bank_4096", |b| {
        b.iter(|| {
            black_box(chroma_bank(4096, 22050.0).expect("valid chroma bank"));
        });
    });
}

fn mel_bank_apply(c: &mut Criterion) {
    let bank = mel_bank(40, FFT_SIZE, SAMPLE_HZ, 20.0, 0.0, None).expect("valid mel bank");
    let spectrum = sine_power_spectrum();

    c.bench_function("mel_bank_apply_and_log", |b| {
        b.iter(|| {
            black_box(
                bank.apply_and_log(black_box(&spectrum), 1e-10)
                    .expect("spectrum matches the bank"),
            );
        });
    });
}

criterion_group!(
    benches,
    mel_bank_design,
    erb_bank_design,
    chroma_bank_design,
    mel_bank_apply,
);
criterion_main!(benches);
