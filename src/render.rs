use chrono::Utc;

use crate::summarize::Chapter;
use crate::transcript::format_hms;

/// Page shell for the final report. Placeholders are filled by string
/// substitution; the script wires chapter divs to the audio player and
/// overlays matching snapshots.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <style>
        body {
            margin: 20px;
            font-family: Arial, sans-serif;
        }

        .container {
            flex: 1;
            overflow-y: auto;
            padding: 20px;
        }

        .summary-container {
            border-right: 1px solid #ddd;
        }

        .vtt-container {
            white-space: pre-wrap;
            display: none;
        }

        .snapshots-container {
            display: none;
        }

        .audio-container {
            position: fixed;
            bottom: 20px;
            left: 50%;
            transform: translateX(-50%);
        }

        div[data-start] {
            display: flex;
            align-items: center;
            margin-bottom: 10px;
            border: 1px solid #ddd;
            padding: 10px;
            border-radius: 5px;
            transition: background-color 0.3s ease;
        }

        div[data-start] img {
            flex: 1 1 33%;
            max-width: 200px;
            height: auto;
            margin-left: auto;
        }

        div[data-start] > * {
            flex: 2 1 66%;
            margin-right: 10px;
        }

        div[data-start]:hover,
        div[data-start].highlight {
            background-color: #f0f0f0;
        }

        div[data-start].playing {
            background-color: #ffdab9;
        }

        .zoomed-img {
            position: fixed;
            z-index: 10;
            width: 50vw;
            height: auto;
            box-shadow: 0 0 8px rgba(0,0,0,0.5);
            display: none;
            pointer-events: none;
            top: 50%;
            left: 50%;
            transform: translate(-50%, -50%);
        }
    </style>
    <script>
        function timeStringToSeconds(timeString) {
            var parts = timeString.split(':');
            var hours = 0;
            var minutes = parseInt(parts[0], 10);
            var seconds = parseInt(parts[1], 10);

            if (parts.length > 2) {
                hours = parseInt(parts[0], 10);
                minutes = parseInt(parts[1], 10);
                seconds = parseInt(parts[2].split('.')[0], 10);
            }

            return hours * 3600 + minutes * 60 + seconds;
        }

        function insertImages() {
            var snapshots = document.querySelectorAll('.snapshots-container img');
            var chapters = document.querySelectorAll('.summary-container div[data-start]');
            var zoomedImg = document.querySelector('.zoomed-img');

            snapshots.forEach(function(snapshot) {
                var time = timeStringToSeconds(snapshot.getAttribute('data-start'));

                chapters.forEach(function(chapter) {
                    var start = timeStringToSeconds(chapter.getAttribute('data-start'));
                    var end = timeStringToSeconds(chapter.getAttribute('data-end'));
                    if (time < start || time >= end) {
                        return;
                    }

                    var img = document.createElement('img');
                    img.src = snapshot.getAttribute('src');
                    img.onmouseover = function() {
                        zoomedImg.src = img.src;
                        zoomedImg.style.display = 'block';
                    };
                    img.onmouseout = function() {
                        zoomedImg.style.display = 'none';
                    };
                    chapter.appendChild(img);
                });
            });
        }

        function playSegment(start) {
            var audioPlayer = document.getElementById('audioPlayer');
            var source = document.getElementById('audioSource');

            source.src = './audio.mp3#t=' + timeStringToSeconds(start);
            audioPlayer.load();
            audioPlayer.play();
        }

        function updateHighlightBasedOnTime() {
            var audioPlayer = document.getElementById('audioPlayer');
            var currentTime = audioPlayer.currentTime;

            var chapters = document.querySelectorAll('.summary-container div[data-start]');
            chapters.forEach(function(div) {
                var startTime = timeStringToSeconds(div.getAttribute('data-start'));
                var endTime = timeStringToSeconds(div.getAttribute('data-end'));

                if (currentTime >= startTime && currentTime < endTime) {
                    div.classList.add('playing');
                } else {
                    div.classList.remove('playing');
                }
            });
        }

        function setupEventListeners() {
            var chapters = document.querySelectorAll('div[data-start]');
            chapters.forEach(function(div) {
                div.addEventListener('click', function() {
                    playSegment(this.getAttribute('data-start'));
                });
            });

            var audioPlayer = document.getElementById('audioPlayer');
            audioPlayer.addEventListener('timeupdate', updateHighlightBasedOnTime);

            insertImages();
        }

        window.onload = setupEventListeners;
    </script>
</head>
<body>
    <h1>{title}</h1>

    <div class="audio-container">
        <audio id="audioPlayer" controls>
            <source id="audioSource" src="./audio.mp3" type="audio/mpeg" />
            Your browser does not support the audio element.
        </audio>
    </div>

    <div class="container summary-container">
    {summary}
    </div>

    <div class="container vtt-container">
    {transcript}
    </div>

    <div class="container snapshots-container">
    {snapshots}
    </div>

    <img class="zoomed-img" src="" alt="">

    <!-- generated {generated} -->
</body>
</html>
"#;

/// Render the ordered chapter list as clickable, time-tagged divs
pub fn summary_html(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .map(|chapter| {
            let start = format_hms(chapter.start);
            let end = format_hms(chapter.end);

            let mut block = String::new();
            block.push_str(&format!(
                "<div data-start=\"{}\" data-end=\"{}\">\n",
                start, end
            ));
            block.push_str(&format!(
                "  <b>{} - {} | {}</b>\n",
                start, end, chapter.title
            ));
            block.push_str(&format!("  <p>{}</p>\n", chapter.summary));
            block.push_str("  <ul>\n");
            for item in &chapter.items {
                block.push_str(&format!("    <li>{}</li>\n", item.markdown));
            }
            block.push_str("  </ul>\n");
            block.push_str("</div>");
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill the page shell with the already-rendered fragments
pub fn index_html(title: &str, summary: &str, transcript: &str, snapshots: &str) -> String {
    PAGE_TEMPLATE
        .replace("{title}", title)
        .replace("{summary}", summary)
        .replace("{transcript}", transcript)
        .replace("{snapshots}", snapshots)
        .replace("{generated}", &Utc::now().to_rfc3339())
}
