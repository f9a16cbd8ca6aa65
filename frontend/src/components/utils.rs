use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::FileList;
use yew::prelude::*;

const ACCEPTED_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

// Debounce function to limit button events
pub fn debounce<F>(duration: i32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));
    let timeout_clone = Rc::clone(&timeout);

    Callback::from(move |_| {
        let mut timeout_ref = timeout_clone.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        let new_timeout = Timeout::new(duration as u32, move || {
            inner_callback();
        });

        *timeout_ref = Some(new_timeout);
    })
}

/// Only one image is analysed at a time; extra files are ignored.
pub fn first_image_file(file_list: &FileList) -> Option<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .find(|file| ACCEPTED_TYPES.contains(&file.type_().as_str()))
        .map(GlooFile::from)
}

pub fn render_error_message(model: &Model) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}

/// Numbers analysis requests so replies to abandoned ones can be dropped.
#[derive(Debug, Default)]
pub struct RequestTracker {
    current: u64,
}

impl RequestTracker {
    pub fn begin(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// Abandon whatever request is in flight.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, request: u64) -> bool {
        request == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::RequestTracker;

    #[test]
    fn reply_after_reset_is_stale() {
        let mut tracker = RequestTracker::default();
        let first = tracker.begin();
        assert!(tracker.is_current(first));

        tracker.invalidate();
        assert!(!tracker.is_current(first));

        let second = tracker.begin();
        assert!(tracker.is_current(second));
        assert!(!tracker.is_current(first));
    }
}
