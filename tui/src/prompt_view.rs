use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::prelude::Widget;
use ratatui::style::Stylize as _;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Clear;
use ratatui::widgets::Paragraph;
use ratatui::widgets::WidgetRef;
use ratatui::widgets::Wrap;
use rootprompt_broker::DecisionTrigger;
use rootprompt_broker::PromptController;
use rootprompt_broker::identity::PLACEHOLDER;

/// Number of rows the prompt needs, hints included.
pub(crate) const PROMPT_HEIGHT: u16 = 10;

const LARGE_STEP: i32 = 10;

/// Applies one key press to the prompt. Returns the trigger that ends the
/// prompt, if the key was one.
pub(crate) fn handle_key(
    controller: &mut PromptController,
    key_event: KeyEvent,
) -> Option<DecisionTrigger> {
    if key_event.kind == KeyEventKind::Release {
        return None;
    }
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key_event.code, KeyCode::Char('c') | KeyCode::Char('d'))
    {
        return Some(DecisionTrigger::Dismissed);
    }
    // Decision shortcuts take no modifier other than Shift.
    let plain = key_event.modifiers.difference(KeyModifiers::SHIFT).is_empty();
    match key_event.code {
        KeyCode::Char('a') | KeyCode::Char('y') if plain => {
            return Some(DecisionTrigger::AllowClicked);
        }
        KeyCode::Char('d') | KeyCode::Char('n') if plain => {
            return Some(DecisionTrigger::DenyClicked);
        }
        KeyCode::Char('q') if plain => return Some(DecisionTrigger::Dismissed),
        KeyCode::Esc => return Some(DecisionTrigger::Dismissed),
        _ => {}
    }
    let duration = controller.duration_mut()?;
    match key_event.code {
        KeyCode::Left | KeyCode::Char('h') => duration.step(-1),
        KeyCode::Right | KeyCode::Char('l') => duration.step(1),
        KeyCode::PageDown => duration.step(-LARGE_STEP),
        KeyCode::PageUp => duration.step(LARGE_STEP),
        KeyCode::Home => duration.set_position(i32::MIN),
        KeyCode::End => duration.set_position(i32::MAX),
        KeyCode::Char(' ') | KeyCode::Char('t') => {
            duration.toggle_notify();
        }
        _ => {}
    }
    None
}

/// Read-only rendering of a live prompt.
pub(crate) struct PromptView<'a> {
    controller: &'a PromptController,
}

impl<'a> PromptView<'a> {
    pub(crate) fn new(controller: &'a PromptController) -> Self {
        Self { controller }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let identity = self.controller.identity();
        let prompt = self.controller.prompt();
        let duration = self.controller.duration();
        let notify = duration.notify();

        let mut lines = vec![
            Line::from("Superuser request".bold()),
            Line::from(vec![
                identity.display_name.clone().cyan().bold(),
                " (".dim(),
                identity.package.clone().dim(),
                ")".dim(),
            ]),
            Line::from(vec![
                "uid ".dim(),
                id_text(prompt.uid).into(),
                "  pid ".dim(),
                id_text(prompt.pid).into(),
            ]),
        ];
        if !identity.shared_with.is_empty() {
            lines.push(Line::from(vec![
                "Shared with: ".dim(),
                identity.shared_with.join(", ").into(),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            "< ".dim(),
            duration.duration().to_string().bold(),
            " >".dim(),
        ]));
        let check = if notify.checked { "[x]" } else { "[ ]" };
        let toggle = Line::from(format!("{check} Notify"));
        lines.push(if notify.enabled { toggle } else { toggle.dim() });
        lines.push(Line::from(""));
        lines.push(hints());
        lines
    }
}

fn id_text(id: i32) -> String {
    if id < 0 {
        PLACEHOLDER.to_string()
    } else {
        id.to_string()
    }
}

fn hints() -> Line<'static> {
    let hint = |key: &'static str, label: &'static str| -> [Span<'static>; 2] {
        [key.cyan(), format!(" {label}   ").dim()]
    };
    Line::from_iter(
        [
            hint("a", "allow"),
            hint("d", "deny"),
            hint("←/→", "duration"),
            hint("space", "notify"),
            hint("esc", "dismiss"),
        ]
        .into_iter()
        .flatten(),
    )
}

impl WidgetRef for &PromptView<'_> {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        Paragraph::new(self.lines())
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
