//! Пример использования верифицированного синтеза речи
//!
//! Этот пример демонстрирует, как выполнить верифицированный синтез
//! с отслеживанием прогресса и как выровнять единицы контента по
//! сегментам транскрипта.

use tts_verify::{
    SpeechEngine, verify_speech_with_progress,
    config::{EngineConfig, TtsModel, TtsVoice},
    align::ContentUnit,
    progress::{DefaultProgressReporter, ProgressReporter},
    notification::{
        ConsoleProgressObserver, ProgressBarObserver,
        FileProgressObserver, CompositeProgressObserver,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализируем логирование
    env_logger::init();

    // Получаем API ключ из переменной окружения
    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");

    let text = "2024년 1월 15일, 사과 3개를 2,000원에 샀습니다.";

    println!("Пример 1: Использование функции-обертки с прогрессом");

    // Создаем репортер прогресса
    let mut reporter = DefaultProgressReporter::new();

    // Создаем комбинированный наблюдатель
    let mut composite_observer = CompositeProgressObserver::new();

    // Добавляем наблюдатель для вывода в консоль
    composite_observer.add_observer(Box::new(ConsoleProgressObserver::new()));

    // Добавляем наблюдатель для отображения прогресс-бара
    composite_observer.add_observer(Box::new(ProgressBarObserver::new(50)));

    // Добавляем наблюдатель для записи в файл
    composite_observer.add_observer(Box::new(FileProgressObserver::new("progress.log")));

    // Добавляем комбинированный наблюдатель к репортеру
    reporter.add_observer(Box::new(composite_observer));

    // Используем функцию-обертку с поддержкой прогресса
    let result = verify_speech_with_progress(text, "ko", &api_key, Box::new(reporter)).await?;

    println!(
        "Синтез завершен за {} попыток со сходством {:.3}. Аудио: {}",
        result.attempt_count, result.final_similarity, result.audio_reference,
    );
    println!("Нормализованный текст: {}", result.normalized_text);

    println!("\nПример 2: Использование объекта SpeechEngine с настраиваемой конфигурацией");

    // Создаем конфигурацию
    let config = EngineConfig {
        openai_api_key: api_key,
        tts_model: TtsModel::HighDefinition,
        tts_voice: TtsVoice::Nova,
        accuracy_threshold: 0.9,
        max_attempts: 3,
        factors_path: Some("correction_factors.json".to_string()),
        ..EngineConfig::default()
    };

    // Создаем движок с провайдерами OpenAI
    let mut engine = SpeechEngine::with_openai(config)?;

    // Добавляем наблюдатель для вывода в консоль
    engine.add_observer(Box::new(ConsoleProgressObserver::with_prefix("[Custom] ")))?;

    // Оцениваем длительность до синтеза
    let estimate = engine.estimate_duration(text, "ko");
    println!("Предсказанная длительность: {:.2} секунд", estimate.final_duration);

    // Запускаем верифицированный синтез
    let result = engine.verify_and_synthesize(text, "ko", None).await?;
    println!(
        "Пользовательский синтез завершен: {} ({:.2} секунд)",
        result.audio_reference, result.audio_duration,
    );

    // Выравниваем предложения по сегментам полученного транскрипта
    if let Some(attempt) = result.attempts.last() {
        if attempt.transcript.is_some() {
            let units: Vec<ContentUnit> = result
                .normalized_text
                .split_inclusive('.')
                .enumerate()
                .map(|(index, sentence)| ContentUnit {
                    index,
                    script: sentence.trim().to_string(),
                })
                .collect();

            // В реальном сценарии сегменты приходят из транскрипции
            let segments = Vec::new();
            let outcome = engine.align_content_units(&segments, &units, result.audio_duration);
            println!("Точность выравнивания: {:.1}%", outcome.accuracy);
        }
    }

    Ok(())
}
