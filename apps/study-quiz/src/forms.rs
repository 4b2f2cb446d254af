//! Login and quiz-generation form state.

use quiz_engine::error::ValidationError;
use quiz_engine::models::{
    GenerateQuizRequest, Material, MaterialId, QuestionKind, RegisterRequest, MAX_QUESTIONS,
    MIN_QUESTIONS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Email,
    Password,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub mode: AuthMode,
    pub focus: AuthField,
    pub username: String,
    pub email: String,
    pub password: String,
    /// A request is in flight.
    pub pending: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            mode: AuthMode::Login,
            focus: AuthField::Email,
            username: String::new(),
            email: String::new(),
            password: String::new(),
            pending: false,
        }
    }
}

impl LoginForm {
    pub fn fields(&self) -> &'static [AuthField] {
        match self.mode {
            AuthMode::Login => &[AuthField::Email, AuthField::Password],
            AuthMode::Register => &[AuthField::Username, AuthField::Email, AuthField::Password],
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.focus = self.fields()[0];
        self.password.clear();
    }

    pub fn focus_next(&mut self) {
        self.focus = cycle(self.fields(), self.focus, 1);
    }

    pub fn focus_prev(&mut self) {
        let len = self.fields().len();
        self.focus = cycle(self.fields(), self.focus, len - 1);
    }

    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            AuthField::Username => &mut self.username,
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    /// Email and password, once both are filled in.
    pub fn credentials(&self) -> Option<(String, String)> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return None;
        }
        Some((email.to_string(), self.password.clone()))
    }

    pub fn register_request(&self) -> Option<RegisterRequest> {
        let (email, password) = self.credentials()?;
        let username = self.username.trim();
        if username.is_empty() {
            return None;
        }
        Some(RegisterRequest {
            username: username.to_string(),
            email,
            password,
        })
    }
}

fn cycle<T: Copy + PartialEq>(items: &[T], current: T, step: usize) -> T {
    let idx = items.iter().position(|i| *i == current).unwrap_or(0);
    items[(idx + step) % items.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateField {
    Material,
    Title,
    Count,
    Kinds,
}

impl GenerateField {
    const ALL: [GenerateField; 4] = [
        GenerateField::Material,
        GenerateField::Title,
        GenerateField::Count,
        GenerateField::Kinds,
    ];
}

#[derive(Debug, Clone)]
pub struct GenerateForm {
    pub focus: GenerateField,
    pub material_id: Option<MaterialId>,
    pub title: String,
    pub num_questions: u8,
    /// Toggle per entry of [`QuestionKind::GENERATABLE`].
    pub kinds: [bool; 3],
    /// Highlighted toggle while `Kinds` has focus.
    pub kind_cursor: usize,
    pub pending: bool,
    pub error: Option<String>,
}

impl Default for GenerateForm {
    fn default() -> Self {
        Self {
            focus: GenerateField::Material,
            material_id: None,
            title: String::new(),
            num_questions: 3,
            kinds: [true; 3],
            kind_cursor: 0,
            pending: false,
            error: None,
        }
    }
}

impl GenerateForm {
    pub fn focus_next(&mut self) {
        self.focus = cycle(&GenerateField::ALL, self.focus, 1);
    }

    pub fn focus_prev(&mut self) {
        self.focus = cycle(&GenerateField::ALL, self.focus, GenerateField::ALL.len() - 1);
    }

    /// Step through the available materials. Wraps around.
    pub fn cycle_material(&mut self, materials: &[Material], forward: bool) {
        if materials.is_empty() {
            self.material_id = None;
            return;
        }
        let len = materials.len();
        let next = match self.selected_material(materials) {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        self.material_id = Some(materials[next].id.clone());
    }

    pub fn selected_material(&self, materials: &[Material]) -> Option<usize> {
        let id = self.material_id.as_deref()?;
        materials.iter().position(|m| m.id == id)
    }

    /// Keep the selection valid after the material options reload.
    pub fn sync_materials(&mut self, materials: &[Material]) {
        if self.selected_material(materials).is_none() {
            self.material_id = materials.first().map(|m| m.id.clone());
        }
    }

    pub fn adjust_count(&mut self, delta: i8) {
        let n = self.num_questions as i16 + delta as i16;
        self.num_questions = n.clamp(MIN_QUESTIONS as i16, MAX_QUESTIONS as i16) as u8;
    }

    pub fn toggle_kind(&mut self, index: usize) {
        if let Some(on) = self.kinds.get_mut(index) {
            *on = !*on;
        }
    }

    pub fn selected_kinds(&self) -> Vec<QuestionKind> {
        QuestionKind::GENERATABLE
            .iter()
            .zip(self.kinds)
            .filter(|(_, on)| *on)
            .map(|(kind, _)| kind.clone())
            .collect()
    }

    pub fn request(&self) -> Result<GenerateQuizRequest, ValidationError> {
        let material = self
            .material_id
            .as_deref()
            .ok_or(ValidationError::MissingMaterial)?;
        GenerateQuizRequest::new(material, &self.title, self.num_questions, self.selected_kinds())
    }
}
