#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Split the input into a day and a time query value
    let text = String::from_utf8_lossy(data);
    let (day, time) = text.split_once('&').unwrap_or((text.as_ref(), ""));

    let _ = connect_sim::departure::TimeOfDay::parse(time);
    let _ = connect_sim::departure::SimulatedClock::parse(Some(day), Some(time));
    let _ = connect_sim::web::params::to_boolean(day);
});
