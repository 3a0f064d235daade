#[cfg(feature = "integration-tests")]
use std::{cell::RefCell, rc::Rc};

#[cfg(feature = "integration-tests")]
use cgmath::Vector3;
#[cfg(feature = "integration-tests")]
use trace_ngin::{
    DeviceEvent, WindowEvent,
    context::{Context, InitContext},
    data_structures::texture::Texture,
    demos::cubes::BasicCube,
    flow::{FlowConsturctor, GraphicsFlow, Out},
    pipelines::quad::ScreenQuad,
    render::Render,
};

/// Frame after which the test closes the window.
#[cfg(feature = "integration-tests")]
const LAST_FRAME: u32 = 8;

#[cfg(feature = "integration-tests")]
#[derive(Debug, PartialEq)]
enum Event {
    Ping(u32),
}

#[cfg(feature = "integration-tests")]
#[derive(Default)]
struct State {
    frames: u32,
    drinks: String,
}

/// What the flows saw, kept after the event loop is gone.
#[cfg(feature = "integration-tests")]
#[derive(Default)]
struct Record {
    /// (ping, frame it arrived in)
    driver_events: Vec<(u32, u32)>,
    sink_events: Vec<u32>,
    custom_draws: u32,
    drinks: String,
    frames: u32,
}

/// Fires events and state mutations, keeps `Ping(2)` and passes anything else on.
#[cfg(feature = "integration-tests")]
struct Driver {
    record: Rc<RefCell<Record>>,
    quad: ScreenQuad,
    _backdrop: Texture,
}

#[cfg(feature = "integration-tests")]
impl Driver {
    fn new(ctx: &InitContext, record: Rc<RefCell<Record>>) -> Self {
        let backdrop = Texture::create_storage_texture(&ctx.device, [ctx.width, ctx.height], "Test Backdrop");
        let quad = ScreenQuad::new(&ctx.device, ctx.format, &backdrop);
        Self {
            record,
            quad,
            _backdrop: backdrop,
        }
    }
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<State, Event> for Driver {
    fn on_init(&mut self, ctx: &mut Context, state: &mut State) -> Out<State, Event> {
        assert_eq!(state.frames, 0);
        ctx.clear_colour = wgpu::Color::TRANSPARENT;
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, state: &mut State, _: std::time::Duration) -> Out<State, Event> {
        state.frames += 1;
        let sencha: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| state.drinks.push('🍵'));
        let mate: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| state.drinks.push('🧉'));
        match state.frames {
            3 => Out::FutEvent(vec![
                Box::new(async move { Event::Ping(1) }),
                Box::new(async move { Event::Ping(2) }),
            ]),
            5 => Out::FutFn(vec![Box::new(async move { sencha }), Box::new(async move { mate })]),
            frame if frame >= LAST_FRAME => {
                let mut record = self.record.borrow_mut();
                record.drinks = state.drinks.clone();
                record.frames = frame;
                Out::Configure(Box::new(|ctx: &mut Context| ctx.request_exit()))
            }
            _ => Out::Empty,
        }
    }

    fn on_tick(&mut self, _: &Context, _: &mut State) -> Out<State, Event> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut State, _: &DeviceEvent) -> Out<State, Event> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut State, _: &WindowEvent) -> Out<State, Event> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, state: &mut State, event: Event) -> Option<Event> {
        let Event::Ping(ping) = event;
        self.record.borrow_mut().driver_events.push((ping, state.frames));
        (ping != 2).then_some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Composed(vec![
            Render::None,
            self.quad.render(),
            Render::Meshes(Vec::new()),
            Render::Custom(Box::new(|_: &Context, _: &mut wgpu::RenderPass<'pass>| {
                self.record.borrow_mut().custom_draws += 1;
            })),
        ])
    }
}

/// Consumes whatever reaches it.
#[cfg(feature = "integration-tests")]
struct Sink(Rc<RefCell<Record>>);

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<State, Event> for Sink {
    fn on_init(&mut self, _: &mut Context, _: &mut State) -> Out<State, Event> {
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut State, _: std::time::Duration) -> Out<State, Event> {
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut State) -> Out<State, Event> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut State, _: &DeviceEvent) -> Out<State, Event> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut State, _: &WindowEvent) -> Out<State, Event> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut State, event: Event) -> Option<Event> {
        let Event::Ping(ping) = event;
        self.0.borrow_mut().sink_events.push(ping);
        None
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_route_resolved_events_through_every_flow() {
    let record = Rc::new(RefCell::new(Record::default()));

    // The cube comes first and has to pass every event on.
    let cube: FlowConsturctor<State, Event> = Box::new(|ctx| {
        Box::pin(async move {
            Box::new(BasicCube::new(&ctx, Vector3::new(0.0, 0.0, 0.0))) as Box<dyn GraphicsFlow<_, _>>
        })
    });
    let driver_record = record.clone();
    let driver: FlowConsturctor<State, Event> = Box::new(move |ctx| {
        Box::pin(async move { Box::new(Driver::new(&ctx, driver_record)) as Box<dyn GraphicsFlow<_, _>> })
    });
    let sink_record = record.clone();
    let sink: FlowConsturctor<State, Event> = Box::new(move |_| {
        Box::pin(async move { Box::new(Sink(sink_record)) as Box<dyn GraphicsFlow<_, _>> })
    });

    if let Err(e) = trace_ngin::flow::run(vec![cube, driver, sink]) {
        panic!("{e:#}");
    }

    let record = record.borrow();
    assert!(record.frames >= LAST_FRAME, "exited after {} frames", record.frames);
    let pings: Vec<u32> = record.driver_events.iter().map(|(ping, _)| *ping).collect();
    assert_eq!(pings, [1, 2]);
    // Fired from the update of frame 3, so never seen earlier.
    assert!(record.driver_events.iter().all(|(_, frame)| *frame >= 3));
    assert_eq!(record.sink_events, [1]);
    assert!(record.drinks.contains('🍵') && record.drinks.contains('🧉'));
    // Both emojis are four bytes.
    assert_eq!(record.drinks.len(), 8, "{}", record.drinks);
    assert!(record.custom_draws > 0);
}
