//! Web Audio backend
//!
//! Node creation failures surface as `AudioError`; scheduling calls on nodes
//! that already exist are fire-and-forget (`.ok()`), and stopping a source
//! that has already stopped is swallowed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::ArrayBuffer;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState, AudioNode, AudioParam,
    BiquadFilterType, GainNode, OscillatorType,
};

use super::backend::{AudioBackend, BufferId, Bus, LoadId, LoadResult, SourceId};
use super::graph::{FilterKind, ParamAutomation, ParamEvent, SoundGraph, Source, Voice, Waveform, noise_samples};
use super::{AudioError, Result};

type Completed = Rc<RefCell<Vec<(LoadId, Result<AudioBuffer>)>>>;

pub struct WebAudioBackend {
    ctx: AudioContext,
    master: GainNode,
    buses: [GainNode; 3],
    buffers: HashMap<BufferId, AudioBuffer>,
    /// Started buffer sources, their bus and when they end
    sources: HashMap<SourceId, (AudioBufferSourceNode, Bus, f64)>,
    completed: Completed,
    next_id: u64,
}

fn node_error(kind: &'static str) -> impl Fn(JsValue) -> AudioError {
    move |_| AudioError::NodeCreation(kind)
}

fn js_error(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

impl WebAudioBackend {
    /// Create the context and the master/bus gain nodes
    pub fn new() -> Result<Self> {
        let ctx = AudioContext::new().map_err(|_| AudioError::ContextUnavailable)?;

        let master = ctx.create_gain().map_err(node_error("gain"))?;
        master
            .connect_with_audio_node(&ctx.destination())
            .map_err(node_error("gain"))?;

        let make_bus = || -> Result<GainNode> {
            let bus = ctx.create_gain().map_err(node_error("gain"))?;
            bus.connect_with_audio_node(&master).map_err(node_error("gain"))?;
            Ok(bus)
        };
        let buses = [make_bus()?, make_bus()?, make_bus()?];

        Ok(Self {
            ctx,
            master,
            buses,
            buffers: HashMap::new(),
            sources: HashMap::new(),
            completed: Rc::new(RefCell::new(Vec::new())),
            next_id: 1,
        })
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn schedule_voice(&self, voice: &Voice, output: &GainNode) -> Result<()> {
        let gain = self.ctx.create_gain().map_err(node_error("gain"))?;
        apply_automation(&gain.gain(), &voice.gain);
        gain.connect_with_audio_node(output).map_err(node_error("gain"))?;

        // Wire the filter chain from the gain stage backwards
        let mut next: AudioNode = gain.into();
        for filter in voice.filters.iter().rev() {
            let node = self
                .ctx
                .create_biquad_filter()
                .map_err(node_error("biquad filter"))?;
            node.set_type(filter_type(filter.kind));
            apply_automation(&node.frequency(), &filter.frequency);
            node.q().set_value(filter.q);
            node.gain().set_value(filter.gain_db);
            node.connect_with_audio_node(&next)
                .map_err(node_error("biquad filter"))?;
            next = node.into();
        }

        match &voice.source {
            Source::Oscillator {
                waveform,
                frequency,
                detune,
            } => {
                let osc = self
                    .ctx
                    .create_oscillator()
                    .map_err(node_error("oscillator"))?;
                osc.set_type(oscillator_type(*waveform));
                apply_automation(&osc.frequency(), frequency);
                osc.detune().set_value(*detune);
                osc.connect_with_audio_node(&next)
                    .map_err(node_error("oscillator"))?;
                osc.start_with_when(voice.start).ok();
                osc.stop_with_when(voice.stop).ok();
            }
            Source::Noise { seed } => {
                let sample_rate = self.ctx.sample_rate();
                let len = ((voice.duration() * sample_rate as f64).ceil() as u32).max(1);
                let buffer = self
                    .ctx
                    .create_buffer(1, len, sample_rate)
                    .map_err(node_error("noise buffer"))?;
                let mut samples = noise_samples(*seed, len as usize);
                buffer
                    .copy_to_channel(&mut samples[..], 0)
                    .map_err(node_error("noise buffer"))?;

                let source = self
                    .ctx
                    .create_buffer_source()
                    .map_err(node_error("buffer source"))?;
                source.set_buffer(Some(&buffer));
                source
                    .connect_with_audio_node(&next)
                    .map_err(node_error("buffer source"))?;
                source.start_with_when(voice.start).ok();
                source.stop_with_when(voice.stop).ok();
            }
        }
        Ok(())
    }
}

fn oscillator_type(waveform: Waveform) -> OscillatorType {
    match waveform {
        Waveform::Sine => OscillatorType::Sine,
        Waveform::Square => OscillatorType::Square,
        Waveform::Sawtooth => OscillatorType::Sawtooth,
        Waveform::Triangle => OscillatorType::Triangle,
    }
}

fn filter_type(kind: FilterKind) -> BiquadFilterType {
    match kind {
        FilterKind::Lowpass => BiquadFilterType::Lowpass,
        FilterKind::Highpass => BiquadFilterType::Highpass,
        FilterKind::Bandpass => BiquadFilterType::Bandpass,
        FilterKind::Peaking => BiquadFilterType::Peaking,
    }
}

fn apply_automation(param: &AudioParam, automation: &ParamAutomation) {
    param.set_value(automation.default);
    for event in automation.events() {
        match *event {
            ParamEvent::Set { value, time } => {
                param.set_value_at_time(value, time).ok();
            }
            ParamEvent::Linear { value, time } => {
                param.linear_ramp_to_value_at_time(value, time).ok();
            }
            ParamEvent::Exponential { value, time } => {
                param.exponential_ramp_to_value_at_time(value, time).ok();
            }
        }
    }
}

async fn fetch_and_decode(ctx: &AudioContext, path: &str) -> std::result::Result<AudioBuffer, String> {
    let window = web_sys::window().ok_or("no window")?;
    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(js_error)?;
    let response: web_sys::Response = response.dyn_into().map_err(js_error)?;
    if !response.ok() {
        return Err(format!("HTTP {}", response.status()));
    }

    let bytes = JsFuture::from(response.array_buffer().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    let bytes: ArrayBuffer = bytes.dyn_into().map_err(js_error)?;

    let decoded = JsFuture::from(ctx.decode_audio_data(&bytes).map_err(js_error)?)
        .await
        .map_err(js_error)?;
    decoded.dyn_into::<AudioBuffer>().map_err(js_error)
}

impl AudioBackend for WebAudioBackend {
    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    fn resume(&mut self) -> Result<()> {
        if self.ctx.state() == AudioContextState::Suspended {
            self.ctx
                .resume()
                .map_err(|_| AudioError::ContextUnavailable)?;
        }
        Ok(())
    }

    fn set_master_gain(&mut self, value: f32) {
        self.master.gain().set_value(value);
    }

    fn bus_gain(&self, bus: Bus) -> f32 {
        self.buses[bus.index()].gain().value()
    }

    fn set_bus_gain(&mut self, bus: Bus, value: f32, at: f64) {
        let gain = self.buses[bus.index()].gain();
        gain.cancel_scheduled_values(at).ok();
        gain.set_value_at_time(value, at).ok();
    }

    fn ramp_bus_gain(&mut self, bus: Bus, from: f32, to: f32, start: f64, end: f64) {
        let gain = self.buses[bus.index()].gain();
        gain.cancel_scheduled_values(start).ok();
        gain.set_value_at_time(from, start).ok();
        gain.linear_ramp_to_value_at_time(to, end).ok();
    }

    fn play_graph(&mut self, graph: &SoundGraph, bus: Bus) -> Result<()> {
        let output = &self.buses[bus.index()];
        for voice in &graph.voices {
            self.schedule_voice(voice, output)?;
        }
        Ok(())
    }

    fn request_load(&mut self, path: &str) -> LoadId {
        let request = self.next_id();
        let ctx = self.ctx.clone();
        let completed = Rc::clone(&self.completed);
        let path = path.to_string();

        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_and_decode(&ctx, &path)
                .await
                .map_err(|reason| AudioError::Load { path, reason });
            completed.borrow_mut().push((request, result));
        });
        request
    }

    fn poll_loads(&mut self) -> Vec<LoadResult> {
        let finished: Vec<_> = self.completed.borrow_mut().drain(..).collect();
        finished
            .into_iter()
            .map(|(request, result)| match result {
                Ok(buffer) => {
                    let id = self.next_id();
                    let duration = buffer.duration();
                    self.buffers.insert(id, buffer);
                    LoadResult::Ready {
                        request,
                        buffer: id,
                        duration,
                    }
                }
                Err(error) => LoadResult::Failed { request, error },
            })
            .collect()
    }

    fn start_buffer(&mut self, bus: Bus, buffer: BufferId, when: f64) -> Result<SourceId> {
        let decoded = self
            .buffers
            .remove(&buffer)
            .ok_or(AudioError::UnknownBuffer(buffer))?;
        let source = self
            .ctx
            .create_buffer_source()
            .map_err(node_error("buffer source"))?;
        source.set_buffer(Some(&decoded));
        source
            .connect_with_audio_node(&self.buses[bus.index()])
            .map_err(node_error("buffer source"))?;
        source.start_with_when(when).ok();

        let id = self.next_id();
        let ends_at = when.max(self.ctx.current_time()) + decoded.duration();
        self.sources.insert(id, (source, bus, ends_at));
        Ok(id)
    }

    fn stop_source(&mut self, source: SourceId) {
        if let Some((node, _, _)) = self.sources.remove(&source) {
            // Throws if it already ended; nothing to do then
            node.stop().ok();
        }
    }

    fn active_sources(&self, bus: Bus) -> usize {
        let now = self.ctx.current_time();
        self.sources
            .values()
            .filter(|(_, source_bus, ends_at)| *source_bus == bus && now < *ends_at)
            .count()
    }
}
