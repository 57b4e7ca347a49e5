//! Test suite for the host boundary runtime.


#[cfg(test)]
mod link_e2e;

#[cfg(test)]
mod tests {
    use runtime_abi::RADIO_CAP_CELL_INFO;
    use runtime_native::{BoundaryRuntime, ScriptedRadioDriver};
    use std::sync::Arc;

    fn boundary() -> BoundaryRuntime {
        BoundaryRuntime::builder()
            .driver(Arc::new(ScriptedRadioDriver::default()))
            .build()
            .expect("build boundary runtime")
    }

    #[test]
    fn boundary_runtime_build_smoke() {
        let runtime = boundary();
        assert_eq!(runtime.link().state(), host_link::LinkState::Running);
        assert_eq!(runtime.cellinfo().capabilities(), RADIO_CAP_CELL_INFO);
        assert_eq!(runtime.completions().completed_count(), 0);
        assert_eq!(runtime.events().event_count(), 0);
    }

    #[test]
    fn builder_without_driver_is_an_error() {
        assert!(BoundaryRuntime::builder().build().is_err());
    }

    #[test]
    fn inbound_payloads_are_acknowledged() {
        let runtime = boundary();
        assert!(runtime.link().deliver_from_host(&[0x01, 0x02, 0x03]));
        assert!(runtime.link().deliver_from_host(&[]));
    }
}
