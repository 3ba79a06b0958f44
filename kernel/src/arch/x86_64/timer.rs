//! PIT (8253/8254) periodic timer, driving the scheduler's tick.

/// Program PIT channel 0 for periodic interrupts every `interval_ms`
/// milliseconds, delivered as IRQ0 once interrupts are unmasked.
pub fn init(interval_ms: u32) {
    const PIT_FREQUENCY: u32 = 1_193_182;
    let divisor = PIT_FREQUENCY / (1000 / interval_ms);

    // SAFETY: ports 0x43/0x40 are the standard PIT command and channel-0
    // data ports; this sequence is the documented way to program a
    // divisor into rate-generator mode.
    unsafe {
        use x86_64::instructions::port::Port;

        let mut cmd_port: Port<u8> = Port::new(0x43);
        let mut data_port: Port<u8> = Port::new(0x40);

        cmd_port.write(0x36); // channel 0, lobyte/hibyte, rate generator
        data_port.write((divisor & 0xFF) as u8);
        data_port.write((divisor >> 8) as u8);
    }

    log::info!("timer: PIT programmed for {interval_ms}ms ticks");
}
