use std::sync::{Arc, Condvar, Mutex};

use frame::{Attributes, Frame, Metadata};
use media_types::{StreamKind, CLOCK_RATE};
use pipeline_graph::{Filter, FilterError, FilterHost, Input, LogLevel, Output};

use crate::buffer::{select_audio_range_front, select_video_reference, StreamState};
use crate::clock::Clock;
use crate::error::TimeRectifierError;
use crate::scheduler::Scheduler;

/// Frame rate as a num/den fraction (spec §4.3 "a fixed frame rate
/// `fps = num/den`").
#[derive(Debug, Clone, Copy)]
pub struct FrameRate {
    pub num: u64,
    pub den: u64,
}

impl FrameRate {
    pub fn new(num: u64, den: u64) -> Self {
        assert!(num > 0 && den > 0, "frame rate must be strictly positive");
        Self { num, den }
    }

    /// One frame period in CR units: `den/num * CR`.
    pub fn period_180k(&self) -> i64 {
        (self.den * CLOCK_RATE / self.num) as i64
    }
}

struct RectifierState {
    streams: Vec<StreamState>,
    max_clock_time_180k: i64,
    flushing: bool,
}

impl RectifierState {
    fn evict_all(&mut self, cutoff_180k: i64) {
        let force = self.flushing;
        for stream in &mut self.streams {
            stream.evict_before(cutoff_180k, force);
        }
    }
}

/// The TimeRectifier (spec §4.3): given N inputs of decoded frames,
/// produces N synchronized outputs at a fixed frame rate. `process()` only
/// drains inputs into per-stream buffers; emission is driven by the
/// injected [`Scheduler`] ticking every `1/fps`, exactly as spec.md
/// describes and as original_source's `time_rectifier.cpp` splits
/// `process()`/`awakeOnFPS()`.
pub struct TimeRectifier {
    frame_rate: FrameRate,
    analyze_window_180k: i64,
    inputs: Vec<Arc<Input>>,
    outputs: Arc<Vec<Output>>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    state: Arc<Mutex<RectifierState>>,
    flush_cond: Arc<Condvar>,
    scheduler_started: bool,
}

impl TimeRectifier {
    /// `samples_per_frame` gives, for each input, the fixed sample count of
    /// one raw audio frame on that input (`None` for the video input and
    /// for any non-audio input); see [`crate::buffer::StreamState`].
    pub fn new(
        frame_rate: FrameRate,
        analyze_window_180k: u64,
        samples_per_frame: Vec<Option<u32>>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let num_inputs = samples_per_frame.len();
        let inputs = (0..num_inputs).map(|_| Input::new(64)).collect();
        let outputs = Arc::new((0..num_inputs).map(|_| Output::new(16)).collect());
        let streams = samples_per_frame
            .into_iter()
            .map(StreamState::new)
            .collect();
        Self {
            frame_rate,
            analyze_window_180k: analyze_window_180k as i64,
            inputs,
            outputs,
            clock,
            scheduler,
            state: Arc::new(Mutex::new(RectifierState {
                streams,
                max_clock_time_180k: 0,
                flushing: false,
            })),
            flush_cond: Arc::new(Condvar::new()),
            scheduler_started: false,
        }
    }

    fn start_scheduler(&self) {
        let period = self.frame_rate.period_180k();
        let state = self.state.clone();
        let outputs = self.outputs.clone();
        self.scheduler.schedule_every(
            period.max(1) as u64,
            Arc::new(move |t| awake_on_fps(t, period, &state, &outputs)),
        );
    }

    /// Populate each input's stream kind from its first observed frame, and
    /// run spec §4.3's sanity check ("requires to have one video stream
    /// connected"), lazily, since pin kinds are only known once data
    /// arrives (spec §4.3 "Failure semantics": "only detected on first
    /// process to allow lazy pin discovery").
    fn sanity_check(&self) -> Result<(), FilterError> {
        let state = self.state.lock().unwrap();
        if state.streams.iter().any(|s| s.kind == Some(StreamKind::VideoRaw)) {
            return Ok(());
        }
        let all_bound = state.streams.iter().all(|s| s.kind.is_some());
        if all_bound {
            return Err(FilterError::Contract {
                filter: "TimeRectifier".to_string(),
                message: TimeRectifierError::NoVideoInput.to_string(),
            });
        }
        Ok(())
    }
}

impl Filter for TimeRectifier {
    fn name(&self) -> &str {
        "TimeRectifier"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        &self.inputs
    }

    fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        if !self.scheduler_started {
            self.start_scheduler();
            self.scheduler_started = true;
        }

        {
            let mut state = self.state.lock().unwrap();
            for (idx, input) in self.inputs.iter().enumerate() {
                while let Some(frame) = input.try_pop() {
                    let clock_time = self.clock.now_180k();
                    state.max_clock_time_180k = state.max_clock_time_180k.max(clock_time);
                    if state.streams[idx].kind.is_none() {
                        if let Some(Metadata::Stream(m)) = frame.metadata() {
                            state.streams[idx].kind = Some(m.kind);
                            state.streams[idx].sample_rate = m.sample_rate;
                        }
                    }
                    state.streams[idx].push(frame, clock_time);
                }
            }
            let cutoff = self.clock.now_180k() - self.analyze_window_180k;
            state.evict_all(cutoff);
        }

        self.sanity_check()?;
        let _ = host;
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        let now = self.clock.now_180k();
        let final_time = {
            let mut state = self.state.lock().unwrap();
            if state.flushing {
                return Ok(());
            }
            state.flushing = true;
            state.max_clock_time_180k.max(now)
        };
        host.log(
            LogLevel::Debug,
            &format!("scheduling final removal at time {final_time} (now={now})"),
        );

        // Spec §4.3: the final callback only drains remaining buffers, it
        // does not run another selection/emission pass (original_source's
        // `removeOutdatedAllUnsafe(f+1)`, not another `awakeOnFPS`).
        let state = self.state.clone();
        let flush_cond = self.flush_cond.clone();
        self.scheduler.schedule_once(
            final_time.max(0) as u64,
            Box::new(move |t| {
                let mut state = state.lock().unwrap();
                for stream in &mut state.streams {
                    stream.evict_before(t + 1, true);
                }
                flush_cond.notify_all();
            }),
        );

        let guard = self.state.lock().unwrap();
        let _guard = self
            .flush_cond
            .wait_while(guard, |s| !s.streams.iter().all(|st| st.is_empty()))
            .unwrap();
        Ok(())
    }
}

/// One scheduler tick (spec §4.3 `awakeOnFPS(t)`).
fn awake_on_fps(
    t_180k: i64,
    frame_period_180k: i64,
    state: &Mutex<RectifierState>,
    outputs: &[Output],
) {
    let mut state = state.lock().unwrap();
    let cutoff = t_180k - frame_period_180k;
    state.evict_all(cutoff);

    let Some(video_idx) = state
        .streams
        .iter()
        .position(|s| s.kind == Some(StreamKind::VideoRaw))
    else {
        return;
    };

    let ref_index = select_video_reference(&state.streams[video_idx].data, t_180k, frame_period_180k);
    let Some(ref_index) = ref_index else {
        let video = &state.streams[video_idx];
        if video.num_ticks > 0 && !state.flushing {
            tracing::warn!(
                "TimeRectifier: no reference video frame at clock time {t_180k} \
                 (tick {}), neither starting nor flushing",
                video.num_ticks
            );
        } else {
            tracing::debug!("TimeRectifier: no available reference frame for clock time {t_180k}");
        }
        return;
    };

    if state.streams[video_idx].num_ticks > 0
        && state.streams[video_idx].data.len() >= 2
        && ref_index != 1
    {
        tracing::debug!(
            "TimeRectifier: selected video reference frame is not contiguous with the \
             previous one (index={ref_index})"
        );
    }

    let flushing = state.flushing;
    let (ref_media_time, emitted) = {
        let video = &mut state.streams[video_idx];
        let entry = &video.data[ref_index];
        let ref_media_time = entry.frame.attributes().presentation_time.unwrap_or(entry.clock_time_180k);
        let k = video.num_ticks;
        video.num_ticks += 1;
        let media_time = (k as i64) * frame_period_180k;
        let mut attributes = entry.frame.attributes().clone();
        attributes.presentation_time = Some(media_time);
        let emitted = entry.frame.clone().with_attributes(attributes);
        let ref_clock_time = entry.clock_time_180k;
        video.evict_before(ref_clock_time, flushing);
        (ref_media_time, emitted)
    };
    if let Err(err) = outputs[video_idx].post(emitted) {
        tracing::warn!("TimeRectifier: video post failed: {err}");
    }

    for i in 0..state.streams.len() {
        if i == video_idx || state.streams[i].kind != Some(StreamKind::AudioRaw) {
            continue;
        }
        loop {
            let Some(classification) = select_audio_range_front(&state.streams[i].data, ref_media_time, frame_period_180k)
            else {
                break;
            };
            match classification {
                Ok(_) => {}
                Err(()) => {
                    tracing::debug!(
                        "TimeRectifier: dropping stale audio frame on input {i}, \
                         expect discontinuity in the signal"
                    );
                    state.streams[i].data.pop_front();
                    continue;
                }
            }

            let audio = &mut state.streams[i];
            let entry = audio.data.pop_front().expect("just peeked front");
            let samples_per_frame = audio.samples_per_frame.unwrap_or(0).max(1) as i64;
            let sample_rate = audio.sample_rate.unwrap_or(1).max(1) as i64;
            let new_media_time = audio.samples_emitted as i64 * CLOCK_RATE as i64 / sample_rate;
            audio.samples_emitted += samples_per_frame as u64;
            audio.num_ticks += 1;
            let mut attributes = entry.frame.attributes().clone();
            attributes.presentation_time = Some(new_media_time);
            let emitted = entry.frame.with_attributes(attributes);
            if let Err(err) = outputs[i].post(emitted) {
                tracing::warn!("TimeRectifier: audio post failed on input {i}: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::StreamMetadata;
    use std::sync::Arc as StdArc;

    struct TestHost;
    impl FilterHost for TestHost {
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn activate(&self, _active: bool) {}
        fn is_active(&self) -> bool {
            true
        }
    }

    fn video_frame(pt: i64) -> Frame {
        let meta = StdArc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::VideoRaw,
            "raw",
        )));
        Frame::new(vec![0u8; 4], meta)
            .with_attributes(Attributes::default().with_presentation_time(pt))
    }

    fn audio_frame(pt: i64) -> Frame {
        let meta = StdArc::new(Metadata::Stream(
            StreamMetadata::new(StreamKind::AudioRaw, "pcm_s16le").with_sample_rate(44_100),
        ));
        Frame::new(vec![0u8; 4], meta)
            .with_attributes(Attributes::default().with_presentation_time(pt))
    }

    /// Spec §8 scenario 4: fps=25/1, analyze window=20ms. Feed one video
    /// frame per tick at clock times 0, 40, 80 ms and ~23.22ms-cadence
    /// audio; expect output video media times 0, 7200, 14400 (CR units)
    /// and contiguous audio.
    #[test]
    fn scenario_4_fps25_produces_arithmetic_video_progression_and_contiguous_audio() {
        let clock = StdArc::new(VirtualClock::new());
        let scheduler = StdArc::new(ManualScheduler::new());
        let mut rectifier = TimeRectifier::new(
            FrameRate::new(25, 1),
            3_600, // 20ms analyze window
            vec![None, Some(1024)],
            clock.clone() as StdArc<dyn Clock>,
            scheduler.clone() as StdArc<dyn Scheduler>,
        );
        let host = TestHost;

        let video_in = rectifier.inputs()[0].clone();
        let audio_in = rectifier.inputs()[1].clone();
        video_in.connect();
        audio_in.connect();

        let video_out = Input::new(8);
        let audio_out = Input::new(8);
        rectifier.outputs()[0].connect(video_out.clone());
        rectifier.outputs()[1].connect(audio_out.clone());

        let video_pts = [0i64, 7_200, 14_400];
        let audio_pts = [0i64, 4_181, 8_362];

        for (k, &video_pt) in video_pts.iter().enumerate() {
            clock.set(video_pt);
            video_in.push(video_frame(video_pt)).unwrap();
            audio_in.push(audio_frame(audio_pts[k])).unwrap();
            rectifier.process(&host).unwrap();
            scheduler.tick(video_pt);
        }

        let mut video_times = Vec::new();
        while let Some(frame) = video_out.try_pop() {
            video_times.push(frame.attributes().presentation_time.unwrap());
        }
        assert_eq!(video_times, vec![0, 7_200, 14_400]);

        let mut audio_times = Vec::new();
        while let Some(frame) = audio_out.try_pop() {
            audio_times.push(frame.attributes().presentation_time.unwrap());
        }
        assert_eq!(audio_times, vec![0, 4_180, 8_361]);
        for pair in audio_times.windows(2) {
            assert!(pair[1] > pair[0], "audio media times must be strictly increasing");
        }
    }

    #[test]
    fn construction_without_video_input_is_a_contract_error() {
        let clock = StdArc::new(VirtualClock::new());
        let scheduler = StdArc::new(ManualScheduler::new());
        let mut rectifier = TimeRectifier::new(
            FrameRate::new(25, 1),
            3_600,
            vec![Some(1024)],
            clock.clone() as StdArc<dyn Clock>,
            scheduler.clone() as StdArc<dyn Scheduler>,
        );
        let host = TestHost;
        let audio_in = rectifier.inputs()[0].clone();
        audio_in.connect();
        audio_in.push(audio_frame(0)).unwrap();

        assert!(rectifier.process(&host).is_err());
    }

    #[test]
    fn flush_is_idempotent() {
        let clock = StdArc::new(VirtualClock::new());
        let scheduler = StdArc::new(ManualScheduler::new());
        let mut rectifier = TimeRectifier::new(
            FrameRate::new(25, 1),
            3_600,
            vec![None],
            clock.clone() as StdArc<dyn Clock>,
            scheduler.clone() as StdArc<dyn Scheduler>,
        );
        let host = TestHost;
        let video_in = rectifier.inputs()[0].clone();
        video_in.connect();
        video_in.push(video_frame(0)).unwrap();
        rectifier.process(&host).unwrap();
        video_in.disconnect();

        // Drive the scheduled final tick from another thread so the
        // blocking condvar wait inside `flush()` can be satisfied.
        let scheduler_for_fire = scheduler.clone();
        let handle = std::thread::spawn(move || {
            scheduler_for_fire.fire_pending(1);
        });
        rectifier.flush(&host).unwrap();
        handle.join().unwrap();

        rectifier.flush(&host).unwrap();
    }
}
