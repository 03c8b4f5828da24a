//! Soundboard - Main Entry Point
//!
//! The `Soundboard` owns every playing voice and coordinates the full
//! lifecycle: activate loads and starts a looped voice with a fade-in,
//! deactivate fades it out and tears it down, solo isolates one cell, and
//! two periodic drivers keep volumes and band energies flowing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Caller thread(s)                       │
//! │   activate / deactivate / toggle / solo  ──▶ Result         │
//! │   band_energies() / volumes()  ◀── snapshot reads           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ voices: Mutex<HashMap<CellId, Voice>>                       │
//! │     ▲ 10ms fade driver: sample envelopes, push volume to    │
//! │     │                   the sink, tear down finished fades  │
//! │     ▲ ~30ms publish driver: drain taps, FFT, band reduce,   │
//! │     │                       publish snapshot maps           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ play / set_volume / stop
//!                              ▼
//!          PlaybackSink (render callback feeds taps via rtrb)
//! ```
//!
//! A cell with no entry in the voice table is Inactive. The state machine
//! per cell is Inactive -> Starting -> Active -> FadingOut -> Inactive; the
//! FadingOut -> Inactive edge (stop playback, zero the published bands,
//! drop the voice) runs exactly once, on the fade driver.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use ember_dsp::{reduce_bands, SpectrumAnalyzer};

use crate::config::BoardConfig;
use crate::envelope::Envelope;
use crate::error::{EngineError, EngineResult};
use crate::loader::SourceLoader;
use crate::scheduler::Ticker;
use crate::sink::PlaybackSink;
use crate::voice::{CellId, SharedVolume, Voice, VoiceState};

/// The soundboard voice manager.
///
/// Construct one per board and share it by reference; there is no global
/// instance. Dropping it fades nothing - playback stops immediately and the
/// driver threads are joined.
pub struct Soundboard {
    shared: Arc<Shared>,
    _fade_driver: Ticker,
    _publish_driver: Ticker,
}

struct Shared {
    config: BoardConfig,
    loader: Box<dyn SourceLoader>,
    sink: Box<dyn PlaybackSink>,
    /// Single owned aggregate per cell; at most one voice per identifier.
    voices: Mutex<HashMap<CellId, Voice>>,
    /// Published band energies, written only by the drivers. A deactivated
    /// cell keeps an explicit all-zero vector so the display never reads a
    /// stale loud frame.
    bands: RwLock<HashMap<CellId, Vec<f32>>>,
    /// Published current volumes for progress/border indicators.
    volumes: RwLock<HashMap<CellId, f32>>,
}

impl Soundboard {
    /// Start a board with the given configuration and collaborators.
    pub fn new(
        config: BoardConfig,
        loader: Box<dyn SourceLoader>,
        sink: Box<dyn PlaybackSink>,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(Shared::new(config, loader, sink));

        let fade_shared = Arc::clone(&shared);
        let fade_driver = Ticker::spawn(
            "ember-fade",
            shared.config.fade_tick,
            Arc::clone(&shutdown),
            move || fade_shared.tick_fades(Instant::now()),
        )?;

        let publish_shared = Arc::clone(&shared);
        let publish_driver = Ticker::spawn(
            "ember-publish",
            shared.config.publish_tick,
            shutdown,
            move || publish_shared.tick_publish(),
        )?;

        info!(
            fade_tick = ?shared.config.fade_tick,
            publish_tick = ?shared.config.publish_tick,
            "soundboard started"
        );
        Ok(Self {
            shared,
            _fade_driver: fade_driver,
            _publish_driver: publish_driver,
        })
    }

    /// Start the cell's voice (or re-fade it in if it is already live).
    ///
    /// Loader failures abort the activation: no voice is created and no
    /// state changes.
    pub fn activate(&self, cell: &CellId) -> EngineResult<()> {
        self.shared.activate_at(cell, Instant::now())
    }

    /// Fade the cell out; the voice is torn down when the fade completes.
    /// A no-op for cells that are Inactive or already fading out.
    pub fn deactivate(&self, cell: &CellId) {
        self.shared.deactivate_at(cell, Instant::now());
    }

    /// Activate if the cell reads as off (Inactive or fading out),
    /// deactivate otherwise.
    pub fn toggle(&self, cell: &CellId) -> EngineResult<()> {
        self.shared.toggle_at(cell, Instant::now())
    }

    /// Make this the only audible cell: activate it, fade out all others.
    pub fn solo(&self, cell: &CellId) -> EngineResult<()> {
        self.shared.solo_at(cell, Instant::now())
    }

    /// Snapshot of published band energies per cell.
    pub fn band_energies(&self) -> HashMap<CellId, Vec<f32>> {
        self.shared.bands.read().clone()
    }

    /// Snapshot of current per-cell volumes.
    pub fn volumes(&self) -> HashMap<CellId, f32> {
        self.shared.volumes.read().clone()
    }

    /// Lifecycle state of a cell, if it has a live voice.
    pub fn state(&self, cell: &CellId) -> Option<VoiceState> {
        self.shared.voices.lock().get(cell).map(|v| v.state)
    }

    /// Cells whose voices are live and not on their way out.
    pub fn active_cells(&self) -> Vec<CellId> {
        self.shared
            .voices
            .lock()
            .iter()
            .filter(|(_, voice)| voice.state != VoiceState::FadingOut)
            .map(|(cell, _)| cell.clone())
            .collect()
    }

    pub fn config(&self) -> &BoardConfig {
        &self.shared.config
    }
}

impl Drop for Soundboard {
    fn drop(&mut self) {
        // Tickers join in their own Drop; here we just silence the board.
        let mut voices = self.shared.voices.lock();
        for (cell, voice) in voices.drain() {
            voice.playback.stop();
            debug!(cell = %cell, "voice stopped at shutdown");
        }
    }
}

impl Shared {
    fn new(config: BoardConfig, loader: Box<dyn SourceLoader>, sink: Box<dyn PlaybackSink>) -> Self {
        Self {
            config,
            loader,
            sink,
            voices: Mutex::new(HashMap::new()),
            bands: RwLock::new(HashMap::new()),
            volumes: RwLock::new(HashMap::new()),
        }
    }

    fn activate_at(&self, cell: &CellId, now: Instant) -> EngineResult<()> {
        {
            let mut voices = self.voices.lock();
            if let Some(voice) = voices.get_mut(cell) {
                self.refade_in(cell, voice, now);
                return Ok(());
            }
        }

        // Slow path: no live voice. Decode outside the voice lock so the
        // drivers keep ticking during I/O.
        let source = self.loader.load(cell)?;
        let (tap, analyzer) = SpectrumAnalyzer::channel(self.config.fft_block_size)?;

        let mut voices = self.voices.lock();
        if let Some(voice) = voices.get_mut(cell) {
            // Lost a race with a concurrent activate; reuse the winner.
            self.refade_in(cell, voice, now);
            return Ok(());
        }

        let playback = self.sink.play(source, tap, true)?;
        let volume = SharedVolume::new(0.0);
        voices.insert(
            cell.clone(),
            Voice {
                state: VoiceState::Starting,
                envelope: Some(Envelope::new(0.0, 1.0, self.config.fade_in, now)),
                volume,
                analyzer,
                playback,
            },
        );
        drop(voices);

        self.volumes.write().insert(cell.clone(), 0.0);
        info!(cell = %cell, "voice started");
        Ok(())
    }

    /// Re-trigger: supersede any in-flight fade, starting from the live
    /// volume so the transition is continuous. Playback keeps running - no
    /// restart, no audible gap.
    fn refade_in(&self, cell: &CellId, voice: &mut Voice, now: Instant) {
        let current = voice.volume.get();
        voice.envelope = Some(Envelope::new(current, 1.0, self.config.fade_in, now));
        voice.state = VoiceState::Active;
        debug!(cell = %cell, from = current, "re-fading voice in");
    }

    fn deactivate_at(&self, cell: &CellId, now: Instant) {
        let mut voices = self.voices.lock();
        let Some(voice) = voices.get_mut(cell) else {
            debug!(cell = %cell, "deactivate on inactive cell ignored");
            return;
        };
        if voice.state == VoiceState::FadingOut {
            return;
        }

        let current = voice.volume.get();
        voice.envelope = Some(Envelope::new(current, 0.0, self.config.fade_out, now));
        voice.state = VoiceState::FadingOut;
        info!(cell = %cell, from = current, "voice fading out");
    }

    fn toggle_at(&self, cell: &CellId, now: Instant) -> EngineResult<()> {
        let state = self.voices.lock().get(cell).map(|v| v.state);
        match state {
            // A fading-out cell reads as "off", so toggling it brings it back
            None | Some(VoiceState::FadingOut) => self.activate_at(cell, now),
            Some(_) => {
                self.deactivate_at(cell, now);
                Ok(())
            }
        }
    }

    fn solo_at(&self, cell: &CellId, now: Instant) -> EngineResult<()> {
        // Activate first; the complement is computed afterwards so the
        // soloed cell can never land in its own deactivation pass.
        self.activate_at(cell, now)?;

        let others: Vec<CellId> = {
            let voices = self.voices.lock();
            voices.keys().filter(|id| *id != cell).cloned().collect()
        };
        for other in &others {
            self.deactivate_at(other, now);
        }
        if !others.is_empty() {
            info!(cell = %cell, silenced = others.len(), "solo");
        }
        Ok(())
    }

    /// Fade driver body: sample every live envelope, push volumes to the
    /// sink, and tear down voices whose fade-out just finished.
    fn tick_fades(&self, now: Instant) {
        let mut snapshot: Vec<(CellId, f32)> = Vec::new();
        let mut finished: Vec<CellId> = Vec::new();

        {
            let mut voices = self.voices.lock();
            for (cell, voice) in voices.iter_mut() {
                let Some(envelope) = voice.envelope else {
                    continue;
                };
                let sampled = envelope.sample(now);
                voice.volume.set(sampled.volume);
                voice.playback.set_volume(sampled.volume);
                snapshot.push((cell.clone(), sampled.volume));

                if sampled.done {
                    // Dropping the envelope here is what makes completion
                    // fire exactly once; a superseded envelope never gets
                    // this far.
                    voice.envelope = None;
                    match voice.state {
                        VoiceState::Starting => voice.state = VoiceState::Active,
                        VoiceState::FadingOut => finished.push(cell.clone()),
                        VoiceState::Active => {}
                    }
                }
            }

            for cell in &finished {
                if let Some(voice) = voices.remove(cell) {
                    voice.playback.stop();
                    info!(cell = %cell, "voice stopped");
                }
            }
        }

        if !snapshot.is_empty() || !finished.is_empty() {
            let mut volumes = self.volumes.write();
            for (cell, volume) in snapshot {
                volumes.insert(cell, volume);
            }
            for cell in &finished {
                volumes.remove(cell);
            }
        }

        if !finished.is_empty() {
            let mut bands = self.bands.write();
            for cell in finished {
                bands.insert(cell, vec![0.0; self.config.band_count]);
            }
        }
    }

    /// Publish driver body: drain each voice's tap, reduce to band energies
    /// scaled by the live envelope volume, and publish a fresh snapshot.
    fn tick_publish(&self) {
        let band_config = self.config.band_config();

        let mut voices = self.voices.lock();
        if voices.is_empty() {
            return;
        }

        let mut computed: Vec<(CellId, Vec<f32>)> = Vec::with_capacity(voices.len());
        for (cell, voice) in voices.iter_mut() {
            voice.analyzer.process();
            let reduced = reduce_bands(voice.analyzer.magnitudes(), voice.volume.get(), &band_config);
            computed.push((cell.clone(), reduced));
        }

        // Publish while still holding the voice lock so a concurrent
        // teardown cannot interleave its zero-reset with this snapshot.
        let mut bands = self.bands.write();
        for (cell, vector) in computed {
            bands.insert(cell, vector);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{AudioSource, MemoryLoader};
    use crate::sink::{NullSink, PlaybackHandle, PlaybackSink};
    use ember_dsp::{ease, SpectrumTap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const FADE: Duration = Duration::from_secs(4);

    fn test_config() -> BoardConfig {
        BoardConfig {
            fade_in: FADE,
            fade_out: FADE,
            fft_block_size: 256,
            band_count: 16,
            ..BoardConfig::default()
        }
    }

    fn test_loader() -> Box<MemoryLoader> {
        let tone: Vec<f32> = (0..1024)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / 256.0).sin())
            .collect();
        Box::new(
            MemoryLoader::new()
                .with("dungeon", AudioSource::new(tone.clone(), 48_000))
                .with("tavern", AudioSource::new(tone.clone(), 48_000))
                .with("forest", AudioSource::new(tone, 48_000)),
        )
    }

    /// Sink that simulates a render burst at `play` time (fills the tap's
    /// ring) and counts starts/stops for leak assertions.
    #[derive(Default)]
    struct CountingSink {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    struct CountingHandle {
        volume: Arc<SharedVolume>,
        stops: Arc<AtomicUsize>,
    }

    impl PlaybackHandle for CountingHandle {
        fn set_volume(&self, volume: f32) {
            self.volume.set(volume);
        }
        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::Relaxed);
        }
    }

    impl PlaybackSink for CountingSink {
        fn play(
            &self,
            source: AudioSource,
            mut tap: SpectrumTap,
            _looping: bool,
        ) -> EngineResult<Box<dyn PlaybackHandle>> {
            self.starts.fetch_add(1, Ordering::Relaxed);
            tap.push_slice(source.samples());
            Ok(Box::new(CountingHandle {
                volume: SharedVolume::new(0.0),
                stops: Arc::clone(&self.stops),
            }))
        }
    }

    fn test_shared() -> Arc<Shared> {
        Arc::new(Shared::new(
            test_config(),
            test_loader(),
            Box::new(CountingSink::default()),
        ))
    }

    fn cell(name: &str) -> CellId {
        CellId::new(name)
    }

    fn voice_volume(shared: &Shared, cell: &CellId) -> f32 {
        shared.voices.lock().get(cell).unwrap().volume.get()
    }

    fn voice_state(shared: &Shared, cell: &CellId) -> Option<VoiceState> {
        shared.voices.lock().get(cell).map(|v| v.state)
    }

    #[test]
    fn test_activate_creates_one_voice() {
        let shared = test_shared();
        let t0 = Instant::now();

        shared.activate_at(&cell("dungeon"), t0).unwrap();
        shared.activate_at(&cell("dungeon"), t0).unwrap();

        assert_eq!(shared.voices.lock().len(), 1);
        assert_eq!(shared.volumes.read().get(&cell("dungeon")), Some(&0.0));
    }

    #[test]
    fn test_activate_unknown_cell_fails_cleanly() {
        let shared = test_shared();
        let err = shared
            .activate_at(&cell("abyss"), Instant::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::ResourceNotFound(_)));
        assert!(shared.voices.lock().is_empty());
        assert!(shared.volumes.read().is_empty());
    }

    #[test]
    fn test_deactivate_inactive_is_noop() {
        let shared = test_shared();
        shared.deactivate_at(&cell("dungeon"), Instant::now());
        assert!(shared.voices.lock().is_empty());
    }

    #[test]
    fn test_fade_in_scenario() {
        // Full-volume arrival: halfway through a 4s fade the volume matches
        // the easing curve exactly; at 4s it is exactly 1.0.
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let t0 = Instant::now();

        shared.activate_at(&dungeon, t0).unwrap();
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::Starting));

        shared.tick_fades(t0 + FADE / 2);
        let halfway = voice_volume(&shared, &dungeon);
        assert!(halfway > 0.0 && halfway < 1.0);
        assert_eq!(halfway, ease(0.5, true));

        shared.tick_fades(t0 + FADE);
        assert_eq!(voice_volume(&shared, &dungeon), 1.0);
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::Active));
        assert_eq!(shared.volumes.read().get(&dungeon), Some(&1.0));
    }

    #[test]
    fn test_fade_out_scenario_tears_down_and_zeroes_bands() {
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let t0 = Instant::now();

        shared.activate_at(&dungeon, t0).unwrap();
        shared.tick_fades(t0 + FADE);
        shared.tick_publish();
        assert!(shared
            .bands
            .read()
            .get(&dungeon)
            .unwrap()
            .iter()
            .any(|&b| b > 0.0));

        let t1 = t0 + FADE + Duration::from_secs(1);
        shared.deactivate_at(&dungeon, t1);
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::FadingOut));

        shared.tick_fades(t1 + FADE);
        assert!(shared.voices.lock().is_empty());
        assert!(!shared.volumes.read().contains_key(&dungeon));

        // Explicit zero vector, not a missing entry
        let bands = shared.bands.read();
        let vector = bands.get(&dungeon).unwrap();
        assert_eq!(vector.len(), 16);
        assert!(vector.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_deactivate_while_fading_out_is_noop() {
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let t0 = Instant::now();

        shared.activate_at(&dungeon, t0).unwrap();
        shared.tick_fades(t0 + FADE);

        let t1 = t0 + FADE;
        shared.deactivate_at(&dungeon, t1);
        let mid_fade = t1 + FADE / 2;
        shared.tick_fades(mid_fade);
        let volume_before = voice_volume(&shared, &dungeon);

        // Second deactivate must not restart the fade-out
        shared.deactivate_at(&dungeon, mid_fade);
        shared.tick_fades(mid_fade);
        assert_eq!(voice_volume(&shared, &dungeon), volume_before);

        shared.tick_fades(t1 + FADE);
        assert!(shared.voices.lock().is_empty());
    }

    #[test]
    fn test_reactivation_mid_fade_out_is_continuous() {
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let t0 = Instant::now();

        shared.activate_at(&dungeon, t0).unwrap();
        shared.tick_fades(t0 + FADE); // at full volume

        let t1 = t0 + FADE;
        shared.deactivate_at(&dungeon, t1);
        let mid_fade = t1 + FADE / 2;
        shared.tick_fades(mid_fade);
        let live = voice_volume(&shared, &dungeon);
        assert!(live > 0.0 && live < 1.0);

        // Cancel the fade-out; the fade-in must pick up from the live volume
        shared.activate_at(&dungeon, mid_fade).unwrap();
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::Active));
        shared.tick_fades(mid_fade);
        assert_eq!(voice_volume(&shared, &dungeon), live);

        // ...and still reach exactly 1.0
        shared.tick_fades(mid_fade + FADE);
        assert_eq!(voice_volume(&shared, &dungeon), 1.0);
        assert_eq!(shared.voices.lock().len(), 1);
    }

    #[test]
    fn test_cancelled_fade_never_completes_teardown() {
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let t0 = Instant::now();

        shared.activate_at(&dungeon, t0).unwrap();
        shared.deactivate_at(&dungeon, t0 + Duration::from_secs(1));
        shared
            .activate_at(&dungeon, t0 + Duration::from_secs(2))
            .unwrap();

        // Well past where the cancelled fade-out would have finished: the
        // voice must still be alive and settled at full volume
        shared.tick_fades(t0 + Duration::from_secs(60));
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::Active));
        assert_eq!(voice_volume(&shared, &dungeon), 1.0);
        assert_eq!(shared.voices.lock().len(), 1);
    }

    #[test]
    fn test_solo_exclusivity() {
        let shared = test_shared();
        let t0 = Instant::now();
        for name in ["dungeon", "tavern", "forest"] {
            shared.activate_at(&cell(name), t0).unwrap();
        }
        shared.tick_fades(t0 + FADE);

        let t1 = t0 + FADE;
        shared.solo_at(&cell("tavern"), t1).unwrap();

        // The soloed cell is untouched; the complement is fading out
        assert_eq!(voice_state(&shared, &cell("tavern")), Some(VoiceState::Active));
        assert_eq!(
            voice_state(&shared, &cell("dungeon")),
            Some(VoiceState::FadingOut)
        );
        assert_eq!(
            voice_state(&shared, &cell("forest")),
            Some(VoiceState::FadingOut)
        );

        // All fades settled: exactly one live voice remains
        shared.tick_fades(t1 + FADE);
        let voices = shared.voices.lock();
        assert_eq!(voices.len(), 1);
        assert!(voices.contains_key(&cell("tavern")));
        assert_eq!(voices.get(&cell("tavern")).unwrap().volume.get(), 1.0);
    }

    #[test]
    fn test_solo_on_inactive_board_just_activates() {
        let shared = test_shared();
        shared.solo_at(&cell("forest"), Instant::now()).unwrap();
        assert_eq!(shared.voices.lock().len(), 1);
    }

    #[test]
    fn test_toggle_flips_through_lifecycle() {
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let t0 = Instant::now();

        shared.toggle_at(&dungeon, t0).unwrap();
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::Starting));

        shared.toggle_at(&dungeon, t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::FadingOut));

        // Toggling a fading-out cell brings it back
        shared.toggle_at(&dungeon, t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(voice_state(&shared, &dungeon), Some(VoiceState::Active));
    }

    #[test]
    fn test_publish_scales_bands_by_envelope_volume() {
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let t0 = Instant::now();

        shared.activate_at(&dungeon, t0).unwrap();

        // Volume still zero: spectrum is live but bands must be silent
        shared.tick_publish();
        assert!(shared
            .bands
            .read()
            .get(&dungeon)
            .unwrap()
            .iter()
            .all(|&b| b == 0.0));

        // At full volume the same spectrum produces non-zero bands
        shared.tick_fades(t0 + FADE);
        shared.tick_publish();
        let bands = shared.bands.read();
        let vector = bands.get(&dungeon).unwrap();
        assert_eq!(vector.len(), 16);
        assert!(vector.iter().any(|&b| b > 0.0));
        assert!(vector.iter().all(|b| b.is_finite() && *b >= 0.0));
    }

    #[test]
    fn test_rapid_cycling_is_resource_bounded() {
        let shared = test_shared();
        let dungeon = cell("dungeon");
        let mut now = Instant::now();

        for _ in 0..10_000 {
            shared.activate_at(&dungeon, now).unwrap();
            shared.deactivate_at(&dungeon, now);
            assert!(shared.voices.lock().len() <= 1);
            // Let the fade-out finish so the next cycle recreates the voice
            now += FADE + Duration::from_millis(1);
            shared.tick_fades(now);
            assert!(shared.voices.lock().is_empty());
        }
    }

    #[test]
    fn test_every_start_gets_exactly_one_stop() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
        };
        let shared = Arc::new(Shared::new(test_config(), test_loader(), Box::new(sink)));
        let dungeon = cell("dungeon");
        let mut now = Instant::now();

        for _ in 0..100 {
            shared.activate_at(&dungeon, now).unwrap();
            shared.deactivate_at(&dungeon, now);
            now += FADE + Duration::from_millis(1);
            shared.tick_fades(now);
        }

        assert_eq!(starts.load(Ordering::Relaxed), 100);
        assert_eq!(stops.load(Ordering::Relaxed), 100);
        assert!(shared.voices.lock().is_empty());
    }

    // Threaded smoke tests against the public API, with real drivers and
    // generous timing margins.

    fn quick_board() -> Soundboard {
        let config = BoardConfig {
            fade_in: Duration::from_millis(40),
            fade_out: Duration::from_millis(40),
            fade_tick: Duration::from_millis(2),
            publish_tick: Duration::from_millis(5),
            fft_block_size: 256,
            ..BoardConfig::default()
        };
        Soundboard::new(config, test_loader(), Box::new(NullSink)).unwrap()
    }

    #[test]
    fn test_board_end_to_end_lifecycle() {
        let board = quick_board();
        let dungeon = cell("dungeon");

        board.activate(&dungeon).unwrap();
        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(board.state(&dungeon), Some(VoiceState::Active));
        assert_eq!(board.volumes().get(&dungeon), Some(&1.0));
        assert_eq!(board.active_cells(), vec![dungeon.clone()]);

        board.deactivate(&dungeon);
        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(board.state(&dungeon), None);
        assert!(board.active_cells().is_empty());
        let bands = board.band_energies();
        assert!(bands.get(&dungeon).unwrap().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_board_shutdown_joins_drivers() {
        let board = quick_board();
        board.activate(&cell("tavern")).unwrap();
        drop(board); // must not hang or panic
    }

    #[test]
    fn test_board_rejects_invalid_config() {
        let config = BoardConfig {
            fft_block_size: 1000,
            ..BoardConfig::default()
        };
        let result = Soundboard::new(config, test_loader(), Box::new(NullSink));
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }
}
