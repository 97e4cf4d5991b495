//! Browser binding
//!
//! `start` is called once from JavaScript with a render callback. From then on
//! the frame loop runs on `requestAnimationFrame` and hands the callback a
//! JSON snapshot every frame; drawing it is the page's business.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::audio::web::WebAudioBackend;
use crate::audio::{AudioBackend, HeadlessBackend};
use crate::highscores::HighScores;
use crate::settings::Settings;

use super::{GameSession, Key};

type Session = GameSession<Box<dyn AudioBackend>>;

struct App {
    session: Session,
    render: js_sys::Function,
}

thread_local! {
    static APP: RefCell<Option<Rc<RefCell<App>>>> = const { RefCell::new(None) };
}

fn audio_backend() -> Box<dyn AudioBackend> {
    match WebAudioBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            log::warn!("No Web Audio ({e}); running silent");
            let mut silent = HeadlessBackend::new();
            silent.deny_resume = true;
            Box::new(silent)
        }
    }
}

fn with_app(f: impl FnOnce(&mut App)) {
    APP.with(|app| {
        if let Some(app) = app.borrow().as_ref() {
            f(&mut app.borrow_mut());
        }
    });
}

/// Boot the game and start the frame loop
#[wasm_bindgen]
pub fn start(render: js_sys::Function) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("logger already set: {e}").into());
    }

    let settings = Settings::load();
    let seed = js_sys::Date::now() as u64;
    let session = GameSession::new(audio_backend(), settings, HighScores::load(), seed);
    let app = Rc::new(RefCell::new(App { session, render }));
    APP.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&app)));

    setup_input_handlers(Rc::clone(&app))?;
    setup_auto_pause(Rc::clone(&app))?;
    request_animation_frame(app);
    Ok(())
}

/// Name recorded with the next high score
#[wasm_bindgen]
pub fn set_player_name(name: &str) {
    with_app(|app| app.session.player_name = name.to_string());
}

/// For a click-to-start overlay: browsers only allow audio after a gesture
#[wasm_bindgen]
pub fn unlock_audio() {
    with_app(|app| app.session.unlock_audio());
}

#[wasm_bindgen]
pub fn toggle_mute() -> bool {
    let mut muted = false;
    with_app(|app| {
        app.session.toggle_mute();
        muted = app.session.audio.is_muted();
    });
    muted
}

#[wasm_bindgen]
pub fn skip_track() {
    with_app(|app| app.session.audio.skip_track());
}

#[wasm_bindgen]
pub fn set_master_volume(volume: f32) {
    with_app(|app| {
        app.session.audio.set_master_volume(volume);
        app.session.settings.master_volume = app.session.audio.master_volume();
        app.session.settings.save();
    });
}

#[wasm_bindgen]
pub fn set_music_volume(volume: f32) {
    with_app(|app| {
        app.session.audio.set_music_volume(volume);
        app.session.settings.music_volume = app.session.audio.music_volume();
        app.session.settings.save();
    });
}

/// Local table as JSON rows
#[wasm_bindgen]
pub fn high_scores_json() -> String {
    let mut json = String::from("[]");
    with_app(|app| {
        if let Ok(rows) = serde_json::to_string(&app.session.high_scores.displayable_list()) {
            json = rows;
        }
    });
    json
}

fn setup_input_handlers(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;

    // Keyboard
    {
        let app = app.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            if let Some(key) = Key::from_dom(&event.key()) {
                event.prevent_default();
                app.borrow_mut().session.key_down(key);
            }
        });
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            if let Some(key) = Key::from_dom(&event.key()) {
                app.borrow_mut().session.key_up(key);
            }
        });
        window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

fn setup_auto_pause(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    // Visibility change (tab switch, minimize)
    {
        let app = app.clone();
        let doc = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if doc.visibility_state() == web_sys::VisibilityState::Hidden {
                app.borrow_mut().session.auto_pause();
            }
        });
        document.add_event_listener_with_callback(
            "visibilitychange",
            closure.as_ref().unchecked_ref(),
        )?;
        closure.forget();
    }

    // Window blur (click outside)
    {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
            app.borrow_mut().session.auto_pause();
        });
        window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

fn request_animation_frame(app: Rc<RefCell<App>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |time: f64| {
        game_loop(app, time);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn game_loop(app: Rc<RefCell<App>>, time: f64) {
    let (render, snapshot) = {
        let mut app = app.borrow_mut();
        app.session.frame(time);
        (app.render.clone(), app.session.snapshot_json())
    };
    // The renderer may call back into the exports, so no borrow is held here
    if let Err(e) = render.call1(&JsValue::NULL, &JsValue::from_str(&snapshot)) {
        log::warn!("Render callback failed: {e:?}");
    }

    request_animation_frame(app);
}
