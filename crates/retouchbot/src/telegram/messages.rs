//! User-facing texts of the bot

use retouchcore::enhance::{Failure, FailureKind, PoolStatus, SubmitError};
use retouchcore::Mode;

fn modes_list() -> String {
    Mode::names().join(", ")
}

pub fn start_text(current: Mode) -> String {
    format!(
        "👋 Привет! Отправь мне фото, и я его улучшу.\n\n\
         Текущий режим: {}\n\
         Сменить режим: /mode <название>\n\
         Доступные режимы: {}",
        current,
        modes_list()
    )
}

pub fn current_mode_text(current: Mode) -> String {
    format!("🎛 Текущий режим: {}\nДоступные режимы: {}", current, modes_list())
}

pub fn mode_set_text(mode: Mode) -> String {
    format!("✅ Режим установлен: {}", mode)
}

pub fn unknown_mode_text() -> String {
    format!("❌ Неверный режим. Доступные: {}", modes_list())
}

pub fn status_text(status: &PoolStatus) -> String {
    format!(
        "📦 В очереди: {} задач\n⚙️ Обработчиков занято: {} из {}",
        status.queued, status.busy, status.workers
    )
}

pub fn accepted_text(mode: Mode, position: usize) -> String {
    format!("📥 Получено изображение. Режим: {}\nПозиция в очереди: {}", mode, position)
}

pub fn rejected_text(err: &SubmitError) -> String {
    match err {
        SubmitError::UnknownMode(_) => unknown_mode_text(),
        SubmitError::QueueFull { .. } => "⏳ Очередь переполнена, попробуйте чуть позже.".to_string(),
        SubmitError::Closed => "⚠️ Бот перезапускается, попробуйте чуть позже.".to_string(),
    }
}

pub fn success_caption(mode: Mode) -> String {
    format!("✅ Готово! Режим: {}", mode)
}

pub fn failure_text(failure: &Failure) -> String {
    match failure.kind {
        FailureKind::Timeout => "⌛ Обработка заняла слишком много времени. Попробуйте изображение поменьше.".to_string(),
        FailureKind::Source => format!("⚠️ Не удалось загрузить изображение: {}", failure.message),
        FailureKind::Processor => format!("❌ Ошибка обработки: {}", failure.message),
    }
}
