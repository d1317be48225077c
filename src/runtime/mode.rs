use super::context::RuntimeContext;
use super::frontend::UserInputEvent;
use super::update::UiUpdate;

pub trait RuntimeMode {
    fn on_user_input(&mut self, input: String, ctx: &mut RuntimeContext);
    fn on_model_update(&mut self, update: UiUpdate, ctx: &mut RuntimeContext);
    fn on_interrupt(&mut self, _ctx: &mut RuntimeContext) {}
    fn on_frontend_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext);
    fn is_run_in_progress(&self) -> bool;
    fn quit_requested(&self) -> bool {
        false
    }
}
