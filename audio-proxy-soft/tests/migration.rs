use std::sync::Arc;
use std::time::Duration;

use audio_proxy_core::{
    AudioConfiguration, AudioSystem, Buffer, DecodedAudio, DeviceDescription, ProxyError, Source,
    SourceState, SourceType,
};
use audio_proxy_soft::{SoftContext, SoftDriver};

fn system() -> (Arc<SoftDriver>, AudioSystem) {
    let driver = SoftDriver::new(&["Speakers", "Headphones"]);
    let mut system = AudioSystem::new(driver.clone());
    system.initialize(AudioConfiguration::default()).unwrap();
    (driver, system)
}

fn on(name: &str) -> AudioConfiguration {
    AudioConfiguration::default().with_device(DeviceDescription::named(name))
}

fn current(driver: &SoftDriver) -> Arc<SoftContext> {
    driver.current_context().unwrap()
}

fn static_source(system: &AudioSystem, rate: u32, frames: usize) -> (Buffer, Source) {
    let buffer = system.spawn_buffer().unwrap();
    buffer.set_data(Arc::new(DecodedAudio::silence(rate, frames)));
    buffer.set_name("clip");
    let source = system.spawn_source().unwrap();
    source.set_static_buffer(&buffer);
    (buffer, source)
}

#[test]
fn playing_source_survives_a_device_switch() {
    let (driver, mut system) = system();
    let (buffer, source) = static_source(&system, 44_100, 500_000);
    let content = buffer.content().unwrap();
    source.set_gain(0.5);
    source.play();
    current(&driver).advance(Duration::from_secs(1));

    let report = system.reinitialize(on("Headphones")).unwrap().unwrap();
    assert!(report.is_clean());
    assert_eq!(system.device_name(), Some("Headphones"));

    assert!(source.is_valid());
    assert_eq!(source.state(), SourceState::Playing);
    assert_eq!(source.source_type(), SourceType::Static);
    assert_eq!(source.playback_position(), Duration::from_secs(1));
    assert_eq!(source.gain(), 0.5);
    assert_eq!(source.static_buffer(), Some(buffer.clone()));

    assert_eq!(buffer.name(), "clip");
    assert_eq!(buffer.sample_count(), 500_000);
    assert!(Arc::ptr_eq(&buffer.content().unwrap(), &content));

    current(&driver).advance(Duration::from_millis(500));
    assert_eq!(source.playback_position(), Duration::from_millis(1500));
}

#[test]
fn previous_context_is_released_without_stray_calls() {
    let (driver, mut system) = system();
    let (_buffer, source) = static_source(&system, 8_000, 8_000);
    source.play();
    let old = current(&driver);

    system.reinitialize(on("Headphones")).unwrap();
    let new = current(&driver);
    assert_ne!(old.id(), new.id());
    assert_eq!(new.device_name(), "Headphones");

    assert_eq!(old.soft_buffers().live_count(), 0);
    assert_eq!(old.soft_sources().live_count(), 0);
    assert_eq!(old.stray_calls(), 0);
    assert_eq!(new.stray_calls(), 0);
    assert!(new.soft_sources().live_count() > 0);

    drop(old);
    assert_eq!(driver.contexts().len(), 1);
}

#[test]
fn paused_and_stopped_sources_come_back_idle() {
    let (driver, mut system) = system();
    let (_, paused) = static_source(&system, 1_000, 10_000);
    let (_, stopped) = static_source(&system, 1_000, 10_000);
    paused.play();
    stopped.play();
    current(&driver).advance(Duration::from_secs(2));
    paused.pause();
    stopped.stop();

    system.reinitialize(on("Headphones")).unwrap();
    assert_eq!(paused.state(), SourceState::Initial);
    assert_eq!(paused.playback_position(), Duration::from_secs(2));
    assert_eq!(stopped.state(), SourceState::Initial);
    assert_eq!(stopped.playback_position(), Duration::ZERO);

    assert!(paused.play());
    current(&driver).advance(Duration::from_secs(1));
    assert_eq!(paused.playback_position(), Duration::from_secs(3));
}

#[test]
fn streaming_queue_keeps_its_place() {
    let (driver, mut system) = system();
    let queue: Vec<Buffer> = [(22_050u32, 22_050usize), (48_000, 48_000)]
        .iter()
        .map(|&(rate, frames)| {
            let buffer = system.spawn_buffer().unwrap();
            buffer.set_data(Arc::new(DecodedAudio::silence(rate, frames)));
            buffer
        })
        .collect();
    let source = system.spawn_source().unwrap();
    source.queue_buffers(&queue);
    source.play();
    current(&driver).advance(Duration::from_millis(1250));

    system.reinitialize(on("Headphones")).unwrap();
    assert_eq!(source.source_type(), SourceType::Streaming);
    assert_eq!(source.queued_buffers(), queue);
    assert_eq!(source.queue_index(), 1);
    assert_eq!(source.playback_position(), Duration::from_millis(1250));
}

#[test]
fn bindings_still_protect_buffers_after_a_switch() {
    let (_driver, mut system) = system();
    let (buffer, source) = static_source(&system, 1_000, 1_000);

    system.reinitialize(on("Headphones")).unwrap();
    assert!(!buffer.reset());
    assert!(source.clear_buffer());
    assert!(buffer.reset());
    assert!(!buffer.is_valid());
}

#[test]
fn unavailable_device_keeps_the_current_one() {
    let (driver, mut system) = system();
    let (_, source) = static_source(&system, 1_000, 10_000);
    source.play();
    driver.fail_device("Headphones");

    let err = system.reinitialize(on("Headphones")).unwrap_err();
    assert!(matches!(err, ProxyError::DeviceNotAvailable(_)));
    assert_eq!(system.device_name(), Some("Speakers"));
    assert_eq!(source.state(), SourceState::Playing);
    assert_eq!(driver.contexts().len(), 1);
}

#[test]
fn context_creation_failure_keeps_the_current_one() {
    let (driver, mut system) = system();
    let (_, source) = static_source(&system, 1_000, 10_000);
    source.play();
    driver.fail_context_creation("Headphones");

    let err = system.reinitialize(on("Headphones")).unwrap_err();
    assert!(matches!(err, ProxyError::ContextCreationFailed(_)));
    assert_eq!(system.device_name(), Some("Speakers"));
    assert_eq!(source.state(), SourceState::Playing);
    assert_eq!(current(&driver).device_name(), "Speakers");
}

#[test]
fn listener_settings_follow_the_device() {
    let (_driver, mut system) = system();
    let listener = system.listener().unwrap();
    listener.set_gain(0.25);
    listener.set_position([1.0, 2.0, 3.0]);

    system.reinitialize(on("Headphones")).unwrap();
    assert!(listener.is_valid());
    assert_eq!(listener.gain(), 0.25);
    assert_eq!(listener.position(), [1.0, 2.0, 3.0]);
}

#[test]
fn proxies_survive_repeated_switches() {
    let (driver, mut system) = system();
    let (buffer, source) = static_source(&system, 1_000, 10_000);
    source.play();

    for device in ["Headphones", "Speakers", "Headphones"] {
        current(&driver).advance(Duration::from_secs(1));
        system.reinitialize(on(device)).unwrap();
    }

    assert_eq!(system.sources().unwrap().lock().pool().epoch(), 3);
    assert_eq!(source.static_buffer(), Some(buffer));
    assert_eq!(source.playback_position(), Duration::from_secs(3));
    assert_eq!(driver.contexts().len(), 1);
    assert_eq!(current(&driver).stray_calls(), 0);
}

#[test]
fn same_device_does_not_migrate() {
    let (driver, mut system) = system();
    let (buffer, _) = static_source(&system, 1_000, 1_000);
    let before = current(&driver).id();

    let config = AudioConfiguration {
        buffer_batch: 64,
        ..AudioConfiguration::default()
    };
    assert!(system.reinitialize(config).unwrap().is_none());
    assert_eq!(current(&driver).id(), before);
    assert!(buffer.is_valid());
    assert_eq!(system.configuration().unwrap().buffer_batch, 64);
}

#[test]
fn deinitialize_releases_everything() {
    let (driver, mut system) = system();
    let (buffer, source) = static_source(&system, 1_000, 1_000);
    let context = current(&driver);

    system.deinitialize();
    assert!(!system.is_initialized());
    assert!(!buffer.is_valid());
    assert!(!source.is_valid());
    assert_eq!(context.soft_buffers().live_count(), 0);
    assert_eq!(context.soft_sources().live_count(), 0);
    assert_eq!(context.stray_calls(), 0);
}
